//! NATS JetStream sink integration tests
//!
//! These tests require a running NATS server with JetStream enabled:
//!   nats-server -js
//!
//! Tests are skipped automatically if NATS is not available.

use a3s_trail::provider::nats::{NatsConfig, NatsSink, StorageType};
use a3s_trail::{EventSink, LogBatch, RecordPublisher};
use std::sync::Arc;

/// Try to connect to NATS. Returns None if server is unavailable.
async fn try_nats_sink(stream_suffix: &str) -> Option<NatsSink> {
    let config = NatsConfig {
        url: "nats://127.0.0.1:4222".to_string(),
        stream_name: format!("TEST_TRAIL_{}", stream_suffix.to_uppercase()),
        subject_prefix: format!("test.trail.{}", stream_suffix),
        storage: StorageType::Memory,
        max_age_secs: 60,
        connect_timeout_secs: 1,
        ..Default::default()
    };

    match NatsSink::connect(config).await {
        Ok(sink) => Some(sink),
        Err(_) => {
            eprintln!("NATS not available, skipping integration test");
            None
        }
    }
}

/// Helper to create a NATS sink, or skip the test
macro_rules! nats_sink {
    ($suffix:expr) => {
        match try_nats_sink($suffix).await {
            Some(s) => s,
            None => return,
        }
    };
}

fn batch(json: &str) -> LogBatch {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_nats_publish_batch() {
    let sink = nats_sink!("publish");
    assert_eq!(sink.name(), "nats");

    let publisher = RecordPublisher::new(Arc::new(sink));
    let published = publisher
        .publish_batch(batch(
            r#"{"Records":[
                {"eventTime":"2021-01-01T00:00:00Z","eventName":"ConsoleLogin","eventSource":"signin.amazonaws.com","eventID":"nats-e1"},
                {"eventTime":"2021-01-01T00:00:01Z","eventName":"GetObject","eventSource":"s3.amazonaws.com","eventID":"nats-e2"}
            ]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(published, 2);
}

#[tokio::test]
async fn test_nats_republish_is_accepted() {
    let sink = nats_sink!("dedup");
    let publisher = RecordPublisher::new(Arc::new(sink));
    let json = r#"{"Records":[{"eventName":"PutObject","eventSource":"s3.amazonaws.com","eventID":"nats-dup-1"}]}"#;

    // Duplicates inside the window are acked (and dropped) by JetStream
    assert_eq!(publisher.publish_batch(batch(json)).await.unwrap(), 1);
    assert_eq!(publisher.publish_batch(batch(json)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_nats_unreachable_server() {
    let config = NatsConfig {
        url: "nats://127.0.0.1:1".to_string(),
        connect_timeout_secs: 1,
        ..Default::default()
    };

    let result = NatsSink::connect(config).await;
    assert!(matches!(result, Err(a3s_trail::TrailError::Connection(_))));
}
