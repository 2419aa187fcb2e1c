//! Configuration: YAML file settings plus the CLI-selected run mode

use crate::error::{Result, TrailError};
use crate::provider::nats::NatsConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// SQS caps `MaxNumberOfMessages` at 10
pub const MAX_QUEUE_FETCH: usize = 10;

/// Settings loaded from `a3s-trail.yml`
#[derive(Debug, Clone, Deserialize)]
pub struct TrailConfig {
    /// Queue URL (required)
    #[serde(default)]
    pub sqs_url: String,

    #[serde(default = "default_region")]
    pub aws_region: String,

    /// Shared-credentials profile; default provider chain when unset
    #[serde(default)]
    pub aws_credential_provider: Option<String>,

    /// Max messages per receive
    #[serde(default = "default_num_queue_fetch")]
    pub num_queue_fetch: usize,

    /// Idle sleep when the queue is empty
    #[serde(default = "default_sleep_time", with = "duration_serde")]
    pub sleep_time: Duration,

    /// Keep processed messages in the queue instead of deleting them
    #[serde(default)]
    pub no_purge: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub output: OutputConfig,
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_num_queue_fetch() -> usize {
    1
}
fn default_sleep_time() -> Duration {
    Duration::from_secs(300)
}
fn default_log_level() -> String {
    "info".into()
}

/// Where published records go
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    /// JSON on stdout; one line per event unless `pretty` is set
    Console {
        #[serde(default)]
        pretty: bool,
    },
    /// NATS JetStream stream
    Nats(NatsConfig),
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig::Console { pretty: false }
    }
}

/// Ingestion-loop settings derived from `TrailConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    pub max_messages: usize,
    pub idle_sleep: Duration,
    pub purge: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_messages: default_num_queue_fetch(),
            idle_sleep: default_sleep_time(),
            purge: true,
        }
    }
}

impl TrailConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| TrailError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&src).map_err(|e| match e {
            TrailError::Config(msg) => TrailError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_yaml(src: &str) -> Result<Self> {
        let cfg: TrailConfig = serde_yaml::from_str(src)
            .map_err(|e| TrailError::Config(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sqs_url.trim().is_empty() {
            return Err(TrailError::Config("sqs_url is required".into()));
        }
        if !(1..=MAX_QUEUE_FETCH).contains(&self.num_queue_fetch) {
            return Err(TrailError::Config(format!(
                "num_queue_fetch must be between 1 and {MAX_QUEUE_FETCH}, got {}",
                self.num_queue_fetch
            )));
        }
        if self.sleep_time.is_zero() {
            return Err(TrailError::Config("sleep_time must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            max_messages: self.num_queue_fetch,
            idle_sleep: self.sleep_time,
            purge: !self.no_purge,
        }
    }
}

/// What a run does; resolved once from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Poll the queue until cancelled
    Queue,
    /// Re-enqueue every log object under `bucket/prefix`, then exit
    Backfill { bucket: String, prefix: String },
}

impl RunMode {
    /// A non-empty bucket selects backfill; the prefix is only used with it
    pub fn from_args(bucket: Option<String>, prefix: Option<String>) -> Self {
        match bucket.filter(|b| !b.is_empty()) {
            Some(bucket) => RunMode::Backfill {
                bucket,
                prefix: prefix.unwrap_or_default(),
            },
            None => RunMode::Queue,
        }
    }
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let parse = |v: &str| v.trim().parse::<u64>().map_err(|e| e.to_string());

        if let Some(v) = s.strip_suffix("ms") {
            return parse(v).map(Duration::from_millis);
        }
        if let Some(v) = s.strip_suffix('s') {
            return parse(v).map(Duration::from_secs);
        }
        if let Some(v) = s.strip_suffix('m') {
            return parse(v).map(|m| Duration::from_secs(m * 60));
        }
        if let Some(v) = s.strip_suffix('h') {
            return parse(v).map(|h| Duration::from_secs(h * 3600));
        }
        Err(format!("unknown duration format: '{s}' (use '300s', '5m' or '500ms')"))
    }
}
