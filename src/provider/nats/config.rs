//! NATS JetStream sink configuration

use serde::{Deserialize, Serialize};

/// JetStream storage backend for the audit stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    File,
    Memory,
}

/// Connection and stream settings for `NatsSink`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// Server URL
    pub url: String,

    /// JetStream stream receiving audit records
    pub stream_name: String,

    /// Subject prefix; events go to `<prefix>.<event source>`
    pub subject_prefix: String,

    pub storage: StorageType,

    /// Maximum number of messages kept (-1 = unlimited)
    pub max_events: i64,

    /// Maximum stream size in bytes (-1 = unlimited)
    pub max_bytes: i64,

    /// Maximum message age in seconds (0 = unlimited)
    pub max_age_secs: u64,

    /// Window in which JetStream drops duplicate `eventID`s
    pub duplicate_window_secs: u64,

    pub connect_timeout_secs: u64,

    pub request_timeout_secs: u64,

    /// Optional auth token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            stream_name: "AUDIT_CLOUDTRAIL".to_string(),
            subject_prefix: "audit.cloudtrail".to_string(),
            storage: StorageType::File,
            max_events: -1,
            max_bytes: -1,
            max_age_secs: 0,
            duplicate_window_secs: 120,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            token: None,
        }
    }
}

impl NatsConfig {
    /// Subjects bound to the stream
    pub fn stream_subjects(&self) -> Vec<String> {
        vec![format!("{}.>", self.subject_prefix)]
    }

    /// Subject for a record from `event_source` (e.g. `signin.amazonaws.com`)
    pub fn subject_for(&self, event_source: &str) -> String {
        let token: String = event_source
            .chars()
            .map(|c| match c {
                '.' | ' ' | '*' | '>' => '_',
                c => c,
            })
            .collect();
        let token = if token.is_empty() { "unknown".to_string() } else { token };
        format!("{}.{}", self.subject_prefix, token)
    }
}
