//! Backfill: re-enqueue stored log objects as synthetic queue messages
//!
//! Lists every object under a bucket prefix (following continuation tokens
//! until the listing is exhausted) and sends one envelope per `.json.gz`
//! key. The first listing or send failure aborts the run; a partial
//! backfill is re-run from scratch, and re-running enqueues duplicates.

use crate::envelope::encode_envelope;
use crate::error::Result;
use crate::provider::{ObjectStore, QueueClient};
use crate::types::ObjectReference;
use std::sync::Arc;

/// Suffix of CloudTrail log objects
pub const LOG_FILE_SUFFIX: &str = ".json.gz";

/// Summary of a completed backfill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Listing pages fetched
    pub pages: usize,
    /// Keys returned by the listing
    pub listed: usize,
    /// Keys enqueued
    pub enqueued: usize,
}

/// One-shot backfill driver
pub struct Backfill {
    queue: Arc<dyn QueueClient>,
    store: Arc<dyn ObjectStore>,
}

impl Backfill {
    pub fn new(queue: Arc<dyn QueueClient>, store: Arc<dyn ObjectStore>) -> Self {
        Self { queue, store }
    }

    /// Enqueue every log object under `bucket/prefix`
    pub async fn run(&self, bucket: &str, prefix: &str) -> Result<BackfillReport> {
        tracing::info!("Backfilling using S3 bucket: s3://{}/{}", bucket, prefix);

        let mut report = BackfillReport::default();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .store
                .list(bucket, prefix, continuation.as_deref())
                .await
                .inspect_err(|e| {
                    tracing::error!(bucket, prefix, error = %e, "Unable to list objects in bucket")
                })?;

            report.pages += 1;
            report.listed += page.keys.len();

            for key in page.keys.iter().filter(|k| k.ends_with(LOG_FILE_SUFFIX)) {
                tracing::info!(key = %key, "Found log file to add to queue");
                self.enqueue(bucket, key)
                    .await
                    .inspect_err(|e| {
                        tracing::error!(key = %key, error = %e, "Failed to push log file onto queue")
                    })?;
                report.enqueued += 1;
            }

            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        tracing::info!(
            bucket,
            prefix,
            pages = report.pages,
            listed = report.listed,
            enqueued = report.enqueued,
            "Backfill complete"
        );
        Ok(report)
    }

    async fn enqueue(&self, bucket: &str, key: &str) -> Result<()> {
        let body = encode_envelope(&ObjectReference::single(bucket, key))?;
        self.queue.send(&body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{decode_envelope, Decoded};
    use crate::error::TrailError;
    use crate::provider::memory::{MemoryObjectStore, MemoryQueue};

    fn backfill(queue: &MemoryQueue, store: &MemoryObjectStore) -> Backfill {
        Backfill::new(Arc::new(queue.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_only_log_files_are_enqueued() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::default();
        store.put("b1", "a.json.gz", "x").await;
        store.put("b1", "b.txt", "x").await;

        let report = backfill(&queue, &store).run("b1", "").await.unwrap();
        assert_eq!(report.listed, 2);
        assert_eq!(report.enqueued, 1);

        let sent = queue.sent().await;
        assert_eq!(sent.len(), 1);
        let Decoded::Reference(r) = decode_envelope(&sent[0]).unwrap() else {
            panic!("expected reference");
        };
        assert_eq!(r.bucket, "b1");
        assert_eq!(r.keys, vec!["a.json.gz"]);
    }

    #[tokio::test]
    async fn test_prefix_filters_listing() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::default();
        store.put("b1", "AWSLogs/1/a.json.gz", "x").await;
        store.put("b1", "AWSLogs/2/b.json.gz", "x").await;

        let report = backfill(&queue, &store).run("b1", "AWSLogs/2/").await.unwrap();
        assert_eq!(report.enqueued, 1);
        assert!(queue.sent().await[0].contains("AWSLogs/2/b.json.gz"));
    }

    #[tokio::test]
    async fn test_follows_every_listing_page() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::new(2);
        for i in 0..5 {
            store.put("b1", &format!("k{}.json.gz", i), "x").await;
        }

        let report = backfill(&queue, &store).run("b1", "").await.unwrap();
        assert_eq!(report.pages, 3);
        assert_eq!(report.enqueued, 5);
        assert_eq!(store.list_calls().await, 3);
    }

    #[tokio::test]
    async fn test_rerun_enqueues_duplicates() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::default();
        store.put("b1", "a.json.gz", "x").await;
        store.put("b1", "b.json.gz", "x").await;

        let driver = backfill(&queue, &store);
        driver.run("b1", "").await.unwrap();
        driver.run("b1", "").await.unwrap();

        assert_eq!(queue.sent().await.len(), 4);
    }

    #[tokio::test]
    async fn test_send_failure_aborts() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::default();
        for key in ["a.json.gz", "b.json.gz", "c.json.gz"] {
            store.put("b1", key, "x").await;
        }
        queue.set_fail_send_after(Some(1)).await;

        let err = backfill(&queue, &store).run("b1", "").await.unwrap_err();
        assert!(matches!(err, TrailError::Send(_)));
        assert_eq!(queue.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_failure_aborts() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::default();
        store.set_fail_list(true).await;

        let err = backfill(&queue, &store).run("b1", "").await.unwrap_err();
        assert!(matches!(err, TrailError::List { .. }));
        assert!(queue.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_bucket() {
        let queue = MemoryQueue::new();
        let store = MemoryObjectStore::default();

        let report = backfill(&queue, &store).run("b1", "").await.unwrap();
        assert_eq!(report, BackfillReport { pages: 1, listed: 0, enqueued: 0 });
    }
}
