//! Inbound queue for webhook messages.
//! A single worker hands events to the tracker in arrival order; message ids
//! Meta redelivers are dropped before they are queued.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use ditchpouch_core::types::Event;
use ditchpouch_engine::Tracker;
use tokio::sync::mpsc;

/// How many recent message ids are remembered for de-duplication.
const RECENT_IDS: usize = 256;

/// Bounded set of recently seen ids, oldest evicted first.
struct RecentIds {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// False when `id` was already seen.
    fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }
}

pub struct Inbox {
    tx: mpsc::UnboundedSender<(String, Event)>,
    recent: Mutex<RecentIds>,
}

impl Inbox {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(tracker: Arc<Tracker>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, Event)>();

        tokio::spawn(async move {
            tracing::debug!("📥 Inbound worker started");
            while let Some((message_id, event)) = rx.recv().await {
                if let Err(e) = tracker.handle(event).await {
                    tracing::error!("❌ [whatsapp] Failed to process message {message_id}: {e}");
                }
            }
            tracing::info!("📥 Inbound worker stopped (sender dropped)");
        });

        Self {
            tx,
            recent: Mutex::new(RecentIds::new(RECENT_IDS)),
        }
    }

    /// Queue one decoded message. Returns false for a redelivered id or when
    /// the worker is gone. Messages without an id are never treated as
    /// duplicates.
    pub fn push(&self, message_id: &str, event: Event) -> bool {
        if !message_id.is_empty() {
            let fresh = match self.recent.lock() {
                Ok(mut recent) => recent.insert(message_id),
                Err(e) => {
                    tracing::warn!("⚠️ Recent id set poisoned: {e}");
                    true
                }
            };
            if !fresh {
                tracing::info!("[whatsapp] Skipping redelivered message {message_id}");
                return false;
            }
        }
        if self.tx.send((message_id.to_string(), event)).is_err() {
            tracing::error!("❌ [whatsapp] Inbound worker is gone, dropping {message_id}");
            return false;
        }
        true
    }
}
