//! Collaborator traits: the seams between the pipeline and its backends
//!
//! The ingestion loop and the backfill driver only ever talk to a queue,
//! an object store and an event sink through these traits. AWS (SQS/S3),
//! NATS JetStream, console and in-memory backends implement them.

use crate::error::Result;
use crate::types::{PublishedEvent, ReceivedMessage};
use async_trait::async_trait;
use bytes::Bytes;

pub mod aws;
pub mod console;
pub mod memory;
pub mod nats;

/// A single message queue (e.g., one SQS queue URL)
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `max_messages` messages; an empty vec means the queue is idle
    async fn receive(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>>;

    /// Enqueue a message body
    async fn send(&self, body: &str) -> Result<()>;

    /// Acknowledge a message by deleting it
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

/// Read access to an object store (e.g., S3)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download a whole object into memory
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// List one page of keys under `prefix`, continuing from `continuation`
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectListing>;
}

/// One page of an object listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// Keys on this page, in listing order
    pub keys: Vec<String>,

    /// Token for the next page; `None` when the listing is exhausted
    pub next_continuation: Option<String>,
}

/// Downstream destination for normalized audit records
///
/// `publish` is synchronous from the caller's point of view and must only
/// return `Ok` once every event in the batch has been durably accepted.
/// There is no partial acknowledgement: one failure fails the batch, and
/// the whole batch is redelivered through the queue.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver a non-empty batch with guaranteed delivery
    async fn publish(&self, events: &[PublishedEvent]) -> Result<()>;

    /// Sink name (e.g., "nats", "console", "memory")
    fn name(&self) -> &str;
}
