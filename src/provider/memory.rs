//! In-memory queue, object store and sink
//!
//! Single-process backends for tests and local dry runs. They follow the
//! same contracts as the AWS clients: received messages stay in flight
//! until deleted, listings are lexicographic and paginated, and failures
//! can be injected to exercise the pipeline's error paths.

use super::{EventSink, ObjectListing, ObjectStore, QueueClient};
use crate::error::{Result, TrailError};
use crate::types::{PublishedEvent, ReceivedMessage};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

// ─── Queue ───────────────────────────────────────────────────────

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ReceivedMessage>,
    in_flight: HashMap<String, ReceivedMessage>,
    sent: Vec<String>,
    deleted: Vec<String>,
    receive_calls: usize,
    next_id: u64,
    fail_receive: bool,
    fail_delete: bool,
    fail_send_after: Option<usize>,
}

impl QueueState {
    fn enqueue(&mut self, body: String) -> String {
        self.next_id += 1;
        let message_id = format!("msg-{}", self.next_id);
        self.pending.push_back(ReceivedMessage {
            message_id: message_id.clone(),
            receipt_handle: format!("rh-{}", self.next_id),
            body,
        });
        message_id
    }
}

/// In-memory message queue with visibility semantics
///
/// Received messages move in flight and are only returned again after
/// `redeliver_unacked`, mirroring a visibility-timeout expiry.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a body without recording it as a `send`; returns the message id
    pub async fn push(&self, body: impl Into<String>) -> String {
        self.state.lock().await.enqueue(body.into())
    }

    /// Return every un-deleted in-flight message to the queue
    pub async fn redeliver_unacked(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut messages: Vec<ReceivedMessage> = state.in_flight.drain().map(|(_, m)| m).collect();
        messages.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        let count = messages.len();
        state.pending.extend(messages);
        count
    }

    /// Make every subsequent `receive` fail
    pub async fn set_fail_receive(&self, fail: bool) {
        self.state.lock().await.fail_receive = fail;
    }

    /// Make every subsequent `delete` fail
    pub async fn set_fail_delete(&self, fail: bool) {
        self.state.lock().await.fail_delete = fail;
    }

    /// Fail `send` once `count` sends have succeeded
    pub async fn set_fail_send_after(&self, count: Option<usize>) {
        self.state.lock().await.fail_send_after = count;
    }

    /// Bodies passed to `send`, in order
    pub async fn sent(&self) -> Vec<String> {
        self.state.lock().await.sent.clone()
    }

    /// Receipt handles passed to a successful `delete`, in order
    pub async fn deleted(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    pub async fn receive_calls(&self) -> usize {
        self.state.lock().await.receive_calls
    }

    /// Messages waiting to be received
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Messages received but not yet deleted
    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn receive(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>> {
        let mut state = self.state.lock().await;
        state.receive_calls += 1;
        if state.fail_receive {
            return Err(TrailError::Receive("memory queue unavailable".to_string()));
        }

        let count = max_messages.min(state.pending.len());
        let batch: Vec<ReceivedMessage> = state.pending.drain(..count).collect();
        for message in &batch {
            state
                .in_flight
                .insert(message.receipt_handle.clone(), message.clone());
        }
        Ok(batch)
    }

    async fn send(&self, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(limit) = state.fail_send_after {
            if state.sent.len() >= limit {
                return Err(TrailError::Send("memory queue rejected send".to_string()));
            }
        }
        state.sent.push(body.to_string());
        state.enqueue(body.to_string());
        Ok(())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_delete {
            return Err(TrailError::Delete(format!(
                "memory queue rejected delete of '{}'",
                receipt_handle
            )));
        }
        if state.in_flight.remove(receipt_handle).is_none() {
            return Err(TrailError::Delete(format!(
                "receipt handle '{}' is not in flight",
                receipt_handle
            )));
        }
        state.deleted.push(receipt_handle.to_string());
        Ok(())
    }
}

// ─── Object store ────────────────────────────────────────────────

struct StoreState {
    objects: BTreeMap<(String, String), Bytes>,
    gets: Vec<(String, String)>,
    list_calls: usize,
    page_size: usize,
    fail_list: bool,
}

/// In-memory object store with lexicographic, paginated listings
#[derive(Clone)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryObjectStore {
    /// Create an empty store returning at most `page_size` keys per listing
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                objects: BTreeMap::new(),
                gets: Vec::new(),
                list_calls: 0,
                page_size: page_size.max(1),
                fail_list: false,
            })),
        }
    }

    pub async fn put(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.state
            .lock()
            .await
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub async fn set_fail_list(&self, fail: bool) {
        self.state.lock().await.fail_list = fail;
    }

    /// `(bucket, key)` pairs passed to `get`, in order
    pub async fn gets(&self) -> Vec<(String, String)> {
        self.state.lock().await.gets.clone()
    }

    pub async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let mut state = self.state.lock().await;
        state.gets.push((bucket.to_string(), key.to_string()));
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| TrailError::StorageRead {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "NoSuchKey".to_string(),
            })
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectListing> {
        let mut state = self.state.lock().await;
        state.list_calls += 1;
        if state.fail_list {
            return Err(TrailError::List {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                reason: "AccessDenied".to_string(),
            });
        }

        let mut matching = state
            .objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k)
            .filter(|k| continuation.map_or(true, |after| k.as_str() > after));

        let keys: Vec<String> = matching.by_ref().take(state.page_size).cloned().collect();
        let has_more = matching.next().is_some();

        let next_continuation = if has_more { keys.last().cloned() } else { None };
        Ok(ObjectListing {
            keys,
            next_continuation,
        })
    }
}

// ─── Sink ────────────────────────────────────────────────────────

#[derive(Default)]
struct SinkState {
    batches: Vec<Vec<PublishedEvent>>,
    attempts: usize,
    failures_remaining: usize,
}

/// In-memory event sink recording every accepted batch
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` publish calls
    pub async fn fail_next(&self, count: usize) {
        self.state.lock().await.failures_remaining = count;
    }

    /// Accepted batches, in order
    pub async fn batches(&self) -> Vec<Vec<PublishedEvent>> {
        self.state.lock().await.batches.clone()
    }

    /// All accepted events, flattened in order
    pub async fn events(&self) -> Vec<PublishedEvent> {
        self.state
            .lock()
            .await
            .batches
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Number of publish calls, including rejected ones
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(&self, events: &[PublishedEvent]) -> Result<()> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(TrailError::Publish {
                count: events.len(),
                reason: "memory sink rejected batch".to_string(),
            });
        }
        state.batches.push(events.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_receive_respects_limit_and_order() {
        let queue = MemoryQueue::new();
        for i in 0..3 {
            queue.push(format!("body-{}", i)).await;
        }

        let first = queue.receive(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].body, "body-0");
        assert_eq!(first[1].body, "body-1");

        let second = queue.receive(10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(queue.receive(10).await.unwrap().is_empty());
        assert_eq!(queue.receive_calls().await, 3);
    }

    #[tokio::test]
    async fn test_queue_unacked_messages_are_redelivered() {
        let queue = MemoryQueue::new();
        queue.push("a").await;
        queue.push("b").await;

        let batch = queue.receive(10).await.unwrap();
        queue.delete(&batch[0].receipt_handle).await.unwrap();
        assert_eq!(queue.in_flight_count().await, 1);

        assert_eq!(queue.redeliver_unacked().await, 1);
        let again = queue.receive(10).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].body, "b");
    }

    #[tokio::test]
    async fn test_queue_delete_unknown_handle_fails() {
        let queue = MemoryQueue::new();
        let err = queue.delete("rh-404").await.unwrap_err();
        assert!(matches!(err, TrailError::Delete(_)));
        assert!(queue.deleted().await.is_empty());
    }

    #[tokio::test]
    async fn test_queue_send_enqueues_and_can_fail() {
        let queue = MemoryQueue::new();
        queue.set_fail_send_after(Some(1)).await;

        queue.send("one").await.unwrap();
        let err = queue.send("two").await.unwrap_err();
        assert!(matches!(err, TrailError::Send(_)));

        assert_eq!(queue.sent().await, vec!["one".to_string()]);
        assert_eq!(queue.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_store_get_missing_object() {
        let store = MemoryObjectStore::default();
        let err = store.get("b1", "missing").await.unwrap_err();
        assert!(matches!(err, TrailError::StorageRead { .. }));
        assert_eq!(store.gets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_list_paginates_by_prefix() {
        let store = MemoryObjectStore::new(2);
        for key in ["logs/a", "logs/b", "logs/c", "other/d"] {
            store.put("b1", key, "x").await;
        }
        store.put("b2", "logs/z", "x").await;

        let page1 = store.list("b1", "logs/", None).await.unwrap();
        assert_eq!(page1.keys, vec!["logs/a", "logs/b"]);
        assert_eq!(page1.next_continuation.as_deref(), Some("logs/b"));

        let page2 = store
            .list("b1", "logs/", page1.next_continuation.as_deref())
            .await
            .unwrap();
        assert_eq!(page2.keys, vec!["logs/c"]);
        assert!(page2.next_continuation.is_none());
    }

    #[tokio::test]
    async fn test_sink_fail_next() {
        let sink = MemorySink::new();
        sink.fail_next(1).await;

        let event = PublishedEvent {
            timestamp: chrono::DateTime::<chrono::Utc>::default(),
            record_type: "CloudTrail".to_string(),
            cloudtrail: Default::default(),
        };

        assert!(sink.publish(std::slice::from_ref(&event)).await.is_err());
        sink.publish(std::slice::from_ref(&event)).await.unwrap();

        assert_eq!(sink.attempts().await, 2);
        assert_eq!(sink.batches().await.len(), 1);
        assert_eq!(sink.events().await.len(), 1);
    }
}
