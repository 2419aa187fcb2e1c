//! Event publisher adapter: normalize a log batch and hand it to a sink

use crate::error::Result;
use crate::provider::EventSink;
use crate::types::{AuditRecord, LogBatch, PublishedEvent, RECORD_TYPE};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Normalizes audit records and forwards them to an `EventSink`
///
/// A batch is delivered all-or-nothing: the sink either accepts every
/// event or the whole batch fails and is retried through the queue.
/// A record whose `eventTime` does not parse is still published, stamped
/// with the Unix epoch.
#[derive(Clone)]
pub struct RecordPublisher {
    sink: Arc<dyn EventSink>,
}

impl RecordPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Publish every record of `batch`, returning the number published
    pub async fn publish_batch(&self, batch: LogBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let events: Vec<PublishedEvent> = batch.records.into_iter().map(normalize).collect();
        self.sink.publish(&events).await?;
        Ok(events.len())
    }
}

/// Attach the record type and parsed timestamp to one record
pub fn normalize(mut record: AuditRecord) -> PublishedEvent {
    let timestamp = record.parse_event_time().unwrap_or_else(|| {
        tracing::error!(
            event_time = %record.event_time,
            event_id = %record.event_id,
            "Unable to parse eventTime"
        );
        DateTime::<Utc>::default()
    });

    record.flatten_raw_payloads();

    PublishedEvent {
        timestamp,
        record_type: RECORD_TYPE.to_string(),
        cloudtrail: record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrailError;
    use crate::provider::memory::MemorySink;
    use chrono::TimeZone;

    fn batch(json: &str) -> LogBatch {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_skips_sink() {
        let sink = MemorySink::new();
        let publisher = RecordPublisher::new(Arc::new(sink.clone()));

        assert_eq!(publisher.publish_batch(LogBatch::default()).await.unwrap(), 0);
        assert_eq!(sink.attempts().await, 0);
    }

    #[tokio::test]
    async fn test_publish_normalizes_records() {
        let sink = MemorySink::new();
        let publisher = RecordPublisher::new(Arc::new(sink.clone()));

        let published = publisher
            .publish_batch(batch(
                r#"{"Records":[
                    {"eventTime":"2021-01-01T00:00:00Z","eventName":"ConsoleLogin","requestParameters":{"a":1}},
                    {"eventTime":"yesterday","eventName":"GetObject"}
                ]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(published, 2);

        let batches = sink.batches().await;
        assert_eq!(batches.len(), 1);
        let events = &batches[0];

        assert_eq!(events[0].record_type, "CloudTrail");
        assert_eq!(
            events[0].timestamp,
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(events[0].cloudtrail.raw_request_parameters, r#"{"a":1}"#);

        // Unparseable time degrades the record, not the batch
        assert_eq!(events[1].cloudtrail.event_name, "GetObject");
        assert_eq!(events[1].timestamp, DateTime::<Utc>::default());
    }

    #[tokio::test]
    async fn test_sink_failure_fails_whole_batch() {
        let sink = MemorySink::new();
        sink.fail_next(1).await;
        let publisher = RecordPublisher::new(Arc::new(sink.clone()));

        let err = publisher
            .publish_batch(batch(r#"{"Records":[{"eventName":"A"},{"eventName":"B"}]}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, TrailError::Publish { count: 2, .. }));
        assert!(sink.events().await.is_empty());
        assert_eq!(publisher.sink_name(), "memory");
    }
}
