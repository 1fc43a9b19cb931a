//! Bounded per-session inbound queue.
//!
//! Each charger session drains one of these serially, giving the per-charger
//! single-writer discipline. When the queue is full the OLDEST frame is
//! dropped (and reported to the caller for auditing) — liveness over
//! completeness for a misbehaving charger.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Notify;

/// One inbound CALL waiting for the session worker.
#[derive(Debug, Clone)]
pub struct InboundCall {
    pub message_id: String,
    pub action: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

struct Inner {
    queue: Mutex<VecDeque<InboundCall>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

/// Clonable handle to a bounded drop-oldest queue.
#[derive(Clone)]
pub struct Inbox {
    inner: Arc<Inner>,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
                notify: Notify::new(),
                capacity: capacity.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue a call. Returns the evicted oldest call when the queue was
    /// full, so the caller can log the drop.
    pub fn push(&self, call: InboundCall) -> Option<InboundCall> {
        let dropped = {
            let mut queue = self.inner.queue.lock().expect("inbox lock poisoned");
            let dropped = if queue.len() >= self.inner.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(call);
            dropped
        };
        self.inner.notify.notify_one();
        dropped
    }

    /// Dequeue the next call, waiting if the queue is empty. Returns `None`
    /// once the inbox is closed and drained.
    pub async fn pop(&self) -> Option<InboundCall> {
        loop {
            {
                let mut queue = self.inner.queue.lock().expect("inbox lock poisoned");
                if let Some(call) = queue.pop_front() {
                    return Some(call);
                }
            }
            if self.inner.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        self.inner.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().expect("inbox lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> InboundCall {
        InboundCall {
            message_id: id.to_string(),
            action: "Heartbeat".into(),
            payload: json!({}),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn push_pop_fifo() {
        let inbox = Inbox::new(4);
        inbox.push(call("a"));
        inbox.push(call("b"));
        assert_eq!(inbox.pop().await.unwrap().message_id, "a");
        assert_eq!(inbox.pop().await.unwrap().message_id, "b");
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let inbox = Inbox::new(2);
        assert!(inbox.push(call("a")).is_none());
        assert!(inbox.push(call("b")).is_none());
        let dropped = inbox.push(call("c")).unwrap();
        assert_eq!(dropped.message_id, "a");
        assert_eq!(inbox.pop().await.unwrap().message_id, "b");
        assert_eq!(inbox.pop().await.unwrap().message_id, "c");
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let inbox = Inbox::new(4);
        let popper = inbox.clone();
        let handle = tokio::spawn(async move { popper.pop().await });
        tokio::task::yield_now().await;
        inbox.push(call("late"));
        let got = handle.await.unwrap().unwrap();
        assert_eq!(got.message_id, "late");
    }

    #[tokio::test]
    async fn close_drains_then_returns_none() {
        let inbox = Inbox::new(4);
        inbox.push(call("a"));
        inbox.close();
        assert_eq!(inbox.pop().await.unwrap().message_id, "a");
        assert!(inbox.pop().await.is_none());
    }
}
