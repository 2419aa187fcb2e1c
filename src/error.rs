//! Error types for a3s-trail

use thiserror::Error;

/// Errors that can occur while ingesting or backfilling audit logs
#[derive(Debug, Error)]
pub enum TrailError {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Queue receive failure (fatal to the ingestion loop)
    #[error("Failed to receive messages from queue: {0}")]
    Receive(String),

    /// Malformed envelope, payload, or log object JSON
    #[error("Decode error: {0}")]
    Decode(String),

    /// Object download failure
    #[error("Failed to read s3://{bucket}/{key}: {reason}")]
    StorageRead {
        bucket: String,
        key: String,
        reason: String,
    },

    /// Object listing failure (fatal to backfill)
    #[error("Failed to list objects in s3://{bucket}/{prefix}: {reason}")]
    List {
        bucket: String,
        prefix: String,
        reason: String,
    },

    /// The downstream sink rejected a batch
    #[error("Failed to publish {count} events: {reason}")]
    Publish { count: usize, reason: String },

    /// Acknowledgement (queue delete) failure
    #[error("Failed to delete message from queue: {0}")]
    Delete(String),

    /// Queue send failure (fatal to backfill)
    #[error("Failed to send message to queue: {0}")]
    Send(String),

    /// Sink connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O failure (config file, stdout)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for trail operations
pub type Result<T> = std::result::Result<T, TrailError>;
