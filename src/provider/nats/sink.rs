//! NATS JetStream sink: connect, ensure stream, publish with acks

use super::config::{NatsConfig, StorageType};
use crate::error::{Result, TrailError};
use crate::provider::EventSink;
use crate::types::PublishedEvent;
use async_nats::jetstream;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;

/// Publishes audit records to a JetStream stream
///
/// Every event is published with a `Nats-Msg-Id` of its CloudTrail
/// `eventID`, so redelivered batches are dropped by JetStream inside the
/// stream's duplicate window. A batch only succeeds once every publish
/// ack has arrived.
pub struct NatsSink {
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsSink {
    /// Connect to NATS and initialize the JetStream stream
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let connect_opts = build_connect_options(&config);

        let client = connect_opts
            .connect(&config.url)
            .await
            .map_err(|e| TrailError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "Connected to NATS");

        let jetstream = jetstream::new(client);
        ensure_stream(&jetstream, &config).await?;

        Ok(Self { jetstream, config })
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }
}

#[async_trait]
impl EventSink for NatsSink {
    async fn publish(&self, events: &[PublishedEvent]) -> Result<()> {
        let publish_err = |reason: String| TrailError::Publish {
            count: events.len(),
            reason,
        };

        let mut acks = Vec::with_capacity(events.len());
        for event in events {
            let subject = self.config.subject_for(&event.cloudtrail.event_source);
            let payload = serde_json::to_vec(event)?;

            let mut headers = async_nats::HeaderMap::new();
            if !event.cloudtrail.event_id.is_empty() {
                headers.insert("Nats-Msg-Id", event.cloudtrail.event_id.as_str());
            }

            let ack = self
                .jetstream
                .publish_with_headers(subject.clone(), headers, payload.into())
                .await
                .map_err(|e| publish_err(format!("{}: {}", subject, e)))?;
            acks.push(ack);
        }

        let acks = futures::future::try_join_all(acks.into_iter().map(IntoFuture::into_future))
            .await
            .map_err(|e| publish_err(format!("ack failed: {}", e)))?;

        let duplicates = acks.iter().filter(|a| a.duplicate).count();
        tracing::debug!(
            stream = %self.config.stream_name,
            published = acks.len(),
            duplicates,
            "Batch acknowledged by JetStream"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Build NATS connect options from config
fn build_connect_options(config: &NatsConfig) -> async_nats::ConnectOptions {
    let mut opts = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

    if let Some(ref token) = config.token {
        opts = opts.token(token.clone());
    }

    opts
}

/// Ensure the JetStream stream exists with the configured limits
async fn ensure_stream(
    js: &jetstream::Context,
    config: &NatsConfig,
) -> Result<jetstream::stream::Stream> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: config.stream_subjects(),
        storage,
        max_messages: config.max_events,
        max_bytes: config.max_bytes,
        max_age: Duration::from_secs(config.max_age_secs),
        duplicate_window: Duration::from_secs(config.duplicate_window_secs),
        retention: jetstream::stream::RetentionPolicy::Limits,
        ..Default::default()
    };

    let stream = js
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| TrailError::Connection(format!(
            "Failed to create/get stream '{}': {}",
            config.stream_name, e
        )))?;

    tracing::info!(
        stream = %config.stream_name,
        subjects = ?config.stream_subjects(),
        "JetStream stream ready"
    );

    Ok(stream)
}
