//! Ingestion loop: poll the queue, fetch each referenced log, publish, ack
//!
//! One loop per queue, strictly sequential: a message is only deleted after
//! its publish call has returned, and failures on one message never stop
//! the rest of the batch. Anything not deleted becomes visible again in the
//! queue and is retried, which gives at-least-once delivery.

use crate::config::IngestSettings;
use crate::envelope::{decode_message, Decoded};
use crate::error::Result;
use crate::logfile::fetch_log_batch;
use crate::provider::{ObjectStore, QueueClient};
use crate::publisher::RecordPublisher;
use crate::types::{ObjectReference, ReceivedMessage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What happened during one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Messages returned by the receive call
    pub received: usize,
    /// Messages whose envelope or payload did not decode (left in the queue)
    pub decode_failures: usize,
    /// Validation sentinels seen
    pub validations: usize,
    /// References whose object could not be fetched or parsed
    pub fetch_failures: usize,
    /// Objects whose batch the sink rejected
    pub publish_failures: usize,
    /// Objects fully published
    pub objects_published: usize,
    /// Records handed to the sink
    pub records_published: usize,
    /// Messages deleted from the queue
    pub deleted: usize,
    /// Deletes that failed (logged only)
    pub delete_failures: usize,
}

impl PollOutcome {
    fn absorb(&mut self, other: &PollOutcome) {
        self.received += other.received;
        self.decode_failures += other.decode_failures;
        self.validations += other.validations;
        self.fetch_failures += other.fetch_failures;
        self.publish_failures += other.publish_failures;
        self.objects_published += other.objects_published;
        self.records_published += other.records_published;
        self.deleted += other.deleted;
        self.delete_failures += other.delete_failures;
    }
}

/// Queue-driven ingestion of audit log objects
pub struct Ingester {
    queue: Arc<dyn QueueClient>,
    store: Arc<dyn ObjectStore>,
    publisher: RecordPublisher,
    settings: IngestSettings,
}

impl Ingester {
    pub fn new(
        queue: Arc<dyn QueueClient>,
        store: Arc<dyn ObjectStore>,
        publisher: RecordPublisher,
        settings: IngestSettings,
    ) -> Self {
        Self {
            queue,
            store,
            publisher,
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Poll until `cancel` fires
    ///
    /// Cancellation is observed before each receive and during the idle
    /// sleep; a batch already received is always drained first. A receive
    /// failure ends the loop with an error.
    pub async fn run(&self, cancel: CancellationToken) -> Result<PollOutcome> {
        tracing::info!(
            sink = self.publisher.sink_name(),
            max_messages = self.settings.max_messages,
            idle_sleep_secs = self.settings.idle_sleep.as_secs_f64(),
            purge = self.settings.purge,
            "Ingestion loop started"
        );

        let mut totals = PollOutcome::default();
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = self.poll_once().await?;
            totals.absorb(&outcome);

            if outcome.received == 0 {
                tracing::info!(
                    "No new messages to process, sleeping for {:.0} seconds",
                    self.settings.idle_sleep.as_secs_f64()
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.idle_sleep) => {}
                }
            }
        }

        tracing::info!(
            received = totals.received,
            objects_published = totals.objects_published,
            records_published = totals.records_published,
            deleted = totals.deleted,
            "Ingestion loop stopped"
        );
        Ok(totals)
    }

    /// Receive one batch and drain it
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let messages = self.queue.receive(self.settings.max_messages).await?;

        let mut outcome = PollOutcome {
            received: messages.len(),
            ..Default::default()
        };
        if messages.is_empty() {
            return Ok(outcome);
        }

        tracing::info!("Fetched {} new CloudTrail messages from queue", messages.len());

        for message in &messages {
            self.process_message(message, &mut outcome).await;
        }

        tracing::debug!(?outcome, "Batch drained");
        Ok(outcome)
    }

    async fn process_message(&self, message: &ReceivedMessage, outcome: &mut PollOutcome) {
        match decode_message(message) {
            Err(e) => {
                tracing::error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Skipping undecodable message"
                );
                outcome.decode_failures += 1;
            }
            Ok(Decoded::Validation { message_id }) => {
                tracing::info!(
                    message_id = %message_id,
                    "Acknowledging CloudTrail validation message"
                );
                outcome.validations += 1;
                self.acknowledge(&message_id, &message.receipt_handle, outcome)
                    .await;
            }
            Ok(Decoded::Reference(reference)) => {
                self.process_reference(&reference, outcome).await;
            }
        }
    }

    async fn process_reference(&self, reference: &ObjectReference, outcome: &mut PollOutcome) {
        let Some(key) = reference.first_key() else {
            outcome.decode_failures += 1;
            return;
        };

        tracing::info!(
            message_id = %reference.message_id,
            "Downloading and processing log file: s3://{}/{}",
            reference.bucket,
            key
        );

        let batch = match fetch_log_batch(self.store.as_ref(), &reference.bucket, key).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(
                    message_id = %reference.message_id,
                    error = %e,
                    "Error reading log file"
                );
                outcome.fetch_failures += 1;
                return;
            }
        };

        let published = match self.publisher.publish_batch(batch).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    message_id = %reference.message_id,
                    error = %e,
                    "Error publishing CloudTrail events"
                );
                outcome.publish_failures += 1;
                return;
            }
        };

        outcome.objects_published += 1;
        outcome.records_published += published;

        self.acknowledge(&reference.message_id, &reference.receipt_handle, outcome)
            .await;

        tracing::info!(
            message_id = %reference.message_id,
            "Successfully published {} new events",
            published
        );
    }

    async fn acknowledge(&self, message_id: &str, receipt_handle: &str, outcome: &mut PollOutcome) {
        if !self.settings.purge {
            return;
        }

        match self.queue.delete(receipt_handle).await {
            Ok(()) => outcome.deleted += 1,
            Err(e) => {
                tracing::error!(
                    message_id = %message_id,
                    error = %e,
                    "Error deleting processed queue message"
                );
                outcome.delete_failures += 1;
            }
        }
    }
}
