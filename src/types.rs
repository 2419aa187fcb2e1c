//! Wire and domain types for the a3s-trail pipeline
//!
//! Field names follow the upstream wire formats: SNS notification
//! envelopes are PascalCase, CloudTrail payloads and records are camelCase
//! with a few irregular acronyms (`sourceIPAddress`, `requestID`, ...).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// Format of `eventTime` in CloudTrail records
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Discriminator attached to every published record
pub const RECORD_TYPE: &str = "CloudTrail";

/// A raw message as handed back by the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Queue-assigned message identifier
    pub message_id: String,

    /// Opaque handle used to acknowledge (delete) the message
    pub receipt_handle: String,

    /// Message body (a serialized `TransportEnvelope`)
    pub body: String,
}

/// Notification wrapper delivered through the queue
///
/// Only `Message` is interpreted; every other field is passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportEnvelope {
    #[serde(rename = "Type", default, skip_serializing_if = "String::is_empty")]
    pub message_type: String,

    #[serde(rename = "MessageId", default, skip_serializing_if = "String::is_empty")]
    pub message_id: String,

    #[serde(rename = "TopicArn", default, skip_serializing_if = "String::is_empty")]
    pub topic: String,

    /// Domain payload, itself JSON-encoded
    #[serde(rename = "Message")]
    pub payload: String,

    #[serde(rename = "Timestamp", default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,

    #[serde(rename = "SignatureVersion", default, skip_serializing_if = "String::is_empty")]
    pub signature_version: String,

    #[serde(rename = "Signature", default, skip_serializing_if = "String::is_empty")]
    pub signature: String,

    #[serde(rename = "SigningCertURL", default, skip_serializing_if = "String::is_empty")]
    pub signing_cert_url: String,

    #[serde(rename = "UnsubscribeURL", default, skip_serializing_if = "String::is_empty")]
    pub unsubscribe_url: String,
}

/// Bucket and keys of a log object to ingest
///
/// `message_id` and `receipt_handle` are attached after decoding and are
/// never part of the wire payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(rename = "s3Bucket")]
    pub bucket: String,

    #[serde(rename = "s3ObjectKey")]
    pub keys: Vec<String>,

    #[serde(skip)]
    pub message_id: String,

    #[serde(skip)]
    pub receipt_handle: String,
}

impl ObjectReference {
    /// Create a reference to a single object
    pub fn single(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            keys: vec![key.into()],
            ..Default::default()
        }
    }

    /// The key the pipeline ingests (only the first one is ever used)
    pub fn first_key(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }
}

/// Contents of one log object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<AuditRecord>,
}

impl LogBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One CloudTrail event
///
/// `requestParameters` and `responseElements` are kept as raw JSON text.
/// They are not serialized directly; the publisher copies them into the
/// `rawRequestParameters` / `rawResponseElements` strings instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "eventTime", default, deserialize_with = "null_as_default")]
    pub event_time: String,

    #[serde(rename = "eventVersion", default, deserialize_with = "null_as_default")]
    pub event_version: String,

    #[serde(rename = "eventSource", default, deserialize_with = "null_as_default")]
    pub event_source: String,

    #[serde(rename = "userIdentity", default, deserialize_with = "null_as_default")]
    pub user_identity: serde_json::Map<String, serde_json::Value>,

    #[serde(rename = "eventName", default, deserialize_with = "null_as_default")]
    pub event_name: String,

    #[serde(rename = "awsRegion", default, deserialize_with = "null_as_default")]
    pub aws_region: String,

    #[serde(rename = "sourceIPAddress", default, deserialize_with = "null_as_default")]
    pub source_ip_address: String,

    #[serde(rename = "userAgent", default, deserialize_with = "null_as_default")]
    pub user_agent: String,

    #[serde(rename = "errorCode", default, deserialize_with = "null_as_default")]
    pub error_code: String,

    #[serde(
        rename = "errorMessage",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub error_message: String,

    #[serde(rename = "requestID", default, deserialize_with = "null_as_default")]
    pub request_id: String,

    #[serde(rename = "eventID", default, deserialize_with = "null_as_default")]
    pub event_id: String,

    #[serde(rename = "eventType", default, deserialize_with = "null_as_default")]
    pub event_type: String,

    #[serde(rename = "apiVersion", default, deserialize_with = "null_as_default")]
    pub api_version: String,

    #[serde(rename = "recipientAccountID", default, deserialize_with = "null_as_default")]
    pub recipient_account_id: String,

    #[serde(rename = "requestParameters", default, skip_serializing)]
    pub request_parameters: Option<Box<RawValue>>,

    #[serde(rename = "responseElements", default, skip_serializing)]
    pub response_elements: Option<Box<RawValue>>,

    #[serde(rename = "rawRequestParameters", default, deserialize_with = "null_as_default")]
    pub raw_request_parameters: String,

    #[serde(rename = "rawResponseElements", default, deserialize_with = "null_as_default")]
    pub raw_response_elements: String,
}

impl AuditRecord {
    /// Parse `eventTime` against `LOG_TIME_FORMAT`
    pub fn parse_event_time(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.event_time, LOG_TIME_FORMAT)
            .ok()
            .map(|t| t.and_utc())
    }

    /// Move the raw request/response JSON into their string counterparts
    pub fn flatten_raw_payloads(&mut self) {
        if let Some(raw) = self.request_parameters.take() {
            self.raw_request_parameters = raw.get().to_string();
        }
        if let Some(raw) = self.response_elements.take() {
            self.raw_response_elements = raw.get().to_string();
        }
    }
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A normalized record as handed to an `EventSink`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedEvent {
    /// Parsed `eventTime`, or the Unix epoch when it failed to parse
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Always `RECORD_TYPE`
    #[serde(rename = "type")]
    pub record_type: String,

    pub cloudtrail: AuditRecord,
}
