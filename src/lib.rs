//! # a3s-trail
//!
//! Queue-driven CloudTrail audit-log ingestion for the A3S ecosystem.
//!
//! ## Overview
//!
//! CloudTrail writes log objects to S3 and announces each one through
//! SNS into an SQS queue. `a3s-trail` polls that queue, downloads every
//! referenced object, and republishes the audit records to an event sink
//! (NATS JetStream or stdout). Messages are only deleted after their
//! records were accepted by the sink, so delivery is at-least-once.
//!
//! A one-shot backfill mode lists historical objects in a bucket and
//! re-enqueues them as synthetic notifications.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_trail::{Ingester, IngestSettings, RecordPublisher};
//! use a3s_trail::provider::memory::{MemoryObjectStore, MemoryQueue, MemorySink};
//! use std::sync::Arc;
//!
//! # async fn example() -> a3s_trail::Result<()> {
//! let queue = MemoryQueue::new();
//! let store = MemoryObjectStore::default();
//! let sink = MemorySink::new();
//!
//! store.put("trail-bucket", "a.json.gz", r#"{"Records":[]}"#).await;
//! queue
//!     .push(r#"{"Message":"{\"s3Bucket\":\"trail-bucket\",\"s3ObjectKey\":[\"a.json.gz\"]}"}"#)
//!     .await;
//!
//! let ingester = Ingester::new(
//!     Arc::new(queue),
//!     Arc::new(store),
//!     RecordPublisher::new(Arc::new(sink)),
//!     IngestSettings::default(),
//! );
//! let outcome = ingester.poll_once().await?;
//! assert_eq!(outcome.objects_published, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **QueueClient / ObjectStore / EventSink** traits: backend seams
//! - **envelope**: SNS envelope → object reference decoding
//! - **logfile**: object download and record parsing
//! - **RecordPublisher**: record normalization, all-or-nothing publish
//! - **Ingester**: the polling loop
//! - **Backfill**: bulk re-enqueue of stored objects

pub mod backfill;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ingest;
pub mod logfile;
pub mod provider;
pub mod publisher;
pub mod service;
pub mod types;

// Re-export core types
pub use backfill::{Backfill, BackfillReport};
pub use config::{IngestSettings, OutputConfig, RunMode, TrailConfig};
pub use envelope::{decode_envelope, decode_message, encode_envelope, Decoded, VALIDATION_MESSAGE};
pub use error::{Result, TrailError};
pub use ingest::{Ingester, PollOutcome};
pub use logfile::{fetch_log_batch, parse_log_batch};
pub use provider::{EventSink, ObjectListing, ObjectStore, QueueClient};
pub use publisher::RecordPublisher;
pub use service::{RunSummary, TrailService};
pub use types::{
    AuditRecord, LogBatch, ObjectReference, PublishedEvent, ReceivedMessage, TransportEnvelope,
};

// Re-export backends for convenience
pub use provider::aws::{S3Store, SqsQueue};
pub use provider::console::ConsoleSink;
pub use provider::memory::{MemoryObjectStore, MemoryQueue, MemorySink};
pub use provider::nats::{NatsConfig, NatsSink, StorageType};
