//! Service assembly: wire backends from configuration and run one mode

use crate::backfill::{Backfill, BackfillReport};
use crate::config::{OutputConfig, RunMode, TrailConfig};
use crate::error::Result;
use crate::ingest::{Ingester, PollOutcome};
use crate::provider::aws::{self, S3Store, SqsQueue};
use crate::provider::console::ConsoleSink;
use crate::provider::nats::NatsSink;
use crate::provider::{EventSink, ObjectStore, QueueClient};
use crate::publisher::RecordPublisher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSummary {
    Ingested(PollOutcome),
    Backfilled(BackfillReport),
}

/// A configured ingestion service
///
/// Holds the queue and object store; the sink is only connected when the
/// service runs in queue mode, so a backfill never touches the output.
pub struct TrailService {
    config: TrailConfig,
    queue: Arc<dyn QueueClient>,
    store: Arc<dyn ObjectStore>,
    sink: Option<Arc<dyn EventSink>>,
}

impl TrailService {
    /// Build SQS and S3 clients from the configuration
    pub async fn connect(config: TrailConfig) -> Result<Self> {
        config.validate()?;

        let sdk_config =
            aws::load_sdk_config(&config.aws_region, config.aws_credential_provider.as_deref())
                .await;
        let queue = SqsQueue::new(&sdk_config, config.sqs_url.clone());
        let store = S3Store::new(&sdk_config);

        tracing::debug!(
            sqs_url = %config.sqs_url,
            region = %config.aws_region,
            num_queue_fetch = config.num_queue_fetch,
            sleep_time_secs = config.sleep_time.as_secs(),
            no_purge = config.no_purge,
            "AWS clients configured"
        );

        Ok(Self::with_backends(config, Arc::new(queue), Arc::new(store)))
    }

    /// Use pre-built backends (e.g. in-memory ones)
    pub fn with_backends(
        config: TrailConfig,
        queue: Arc<dyn QueueClient>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            queue,
            store,
            sink: None,
        }
    }

    /// Use this sink instead of the one described by `config.output`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    /// Run in `mode` until it completes or `cancel` fires
    pub async fn run(&self, mode: RunMode, cancel: CancellationToken) -> Result<RunSummary> {
        match mode {
            RunMode::Backfill { bucket, prefix } => {
                tracing::info!("Running in backfill mode");
                let report = Backfill::new(self.queue.clone(), self.store.clone())
                    .run(&bucket, &prefix)
                    .await?;
                Ok(RunSummary::Backfilled(report))
            }
            RunMode::Queue => {
                tracing::info!("Running in queue mode");
                let sink = match &self.sink {
                    Some(sink) => sink.clone(),
                    None => build_sink(&self.config.output).await?,
                };
                let ingester = Ingester::new(
                    self.queue.clone(),
                    self.store.clone(),
                    RecordPublisher::new(sink),
                    self.config.ingest_settings(),
                );
                let totals = ingester.run(cancel).await?;
                Ok(RunSummary::Ingested(totals))
            }
        }
    }
}

/// Connect the sink described by `output`
pub async fn build_sink(output: &OutputConfig) -> Result<Arc<dyn EventSink>> {
    match output {
        OutputConfig::Console { pretty } => Ok(Arc::new(ConsoleSink::new(*pretty))),
        OutputConfig::Nats(nats) => Ok(Arc::new(NatsSink::connect(nats.clone()).await?)),
    }
}
