//! Performance benchmarks for a3s-trail
//!
//! Run with: cargo bench

use a3s_trail::provider::memory::{MemoryObjectStore, MemoryQueue, MemorySink};
use a3s_trail::{decode_envelope, parse_log_batch, IngestSettings, Ingester, RecordPublisher};
use criterion::{criterion_group, criterion_main, Criterion};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::sync::Arc;

fn log_object(records: usize) -> String {
    let records: Vec<serde_json::Value> = (0..records)
        .map(|i| {
            serde_json::json!({
                "eventVersion": "1.08",
                "eventTime": "2021-01-01T00:00:00Z",
                "eventSource": "s3.amazonaws.com",
                "eventName": "GetObject",
                "awsRegion": "us-east-1",
                "sourceIPAddress": "203.0.113.7",
                "userAgent": "aws-cli/2.0",
                "userIdentity": {"type": "IAMUser", "userName": "alice"},
                "requestParameters": {"bucketName": "b1", "key": format!("k{}", i)},
                "responseElements": null,
                "eventID": format!("e-{}", i),
                "recipientAccountID": "123456789012"
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

fn bench_envelope_decode(c: &mut Criterion) {
    let body = serde_json::json!({
        "Type": "Notification",
        "MessageId": "m-1",
        "Message": r#"{"s3Bucket":"b1","s3ObjectKey":["AWSLogs/123/CloudTrail/a.json.gz"]}"#,
    })
    .to_string();

    c.bench_function("decode_envelope", |b| {
        b.iter(|| decode_envelope(&body).unwrap());
    });
}

fn bench_log_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_log_batch");
    for count in [10, 100, 1000] {
        let plain = log_object(count);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plain.as_bytes()).unwrap();
        let gzipped = encoder.finish().unwrap();

        group.bench_function(format!("{} records (json)", count), |b| {
            b.iter(|| parse_log_batch(plain.as_bytes()).unwrap());
        });
        group.bench_function(format!("{} records (gzip)", count), |b| {
            b.iter(|| parse_log_batch(&gzipped).unwrap());
        });
    }
    group.finish();
}

fn bench_poll_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let body = log_object(100);

    c.bench_function("poll_once (10 objects x 100 records)", |b| {
        b.to_async(&rt).iter(|| async {
            let queue = MemoryQueue::new();
            let store = MemoryObjectStore::default();
            for i in 0..10 {
                let key = format!("k{}.json.gz", i);
                store.put("b1", &key, body.clone()).await;
                let payload = format!(r#"{{"s3Bucket":"b1","s3ObjectKey":["{}"]}}"#, key);
                queue
                    .push(serde_json::json!({ "Message": payload }).to_string())
                    .await;
            }

            let ingester = Ingester::new(
                Arc::new(queue),
                Arc::new(store),
                RecordPublisher::new(Arc::new(MemorySink::new())),
                IngestSettings {
                    max_messages: 10,
                    ..Default::default()
                },
            );
            ingester.poll_once().await.unwrap()
        });
    });
}

criterion_group!(benches, bench_envelope_decode, bench_log_parse, bench_poll_cycle);
criterion_main!(benches);
