//! Signal bus shared by the instances of one context.
//!
//! The bus pairs a `tokio::broadcast` channel with a bounded backlog ring.
//! A subscriber that lags behind the channel recovers the dropped signals
//! through [`SignalBus::backlog_since`] instead of losing them.

use crate::payloads::{DEFAULT_BACKLOG_CAPACITY, Signal, SignalEnvelope, SignalId};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Stream of envelopes delivered to one subscriber.
pub type SignalStream = BroadcastStream<SignalEnvelope>;

/// Ring of the most recent envelopes, kept for lag recovery.
struct Backlog {
    entries: VecDeque<SignalEnvelope>,
    capacity: usize,
    next_id: SignalId,
}

impl Backlog {
    fn record(&mut self, signal: Signal) -> SignalEnvelope {
        let envelope = SignalEnvelope {
            id: self.next_id,
            timestamp: Utc::now(),
            signal,
        };
        self.next_id = self.next_id.saturating_add(1);
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(envelope.clone());
        envelope
    }
}

/// Shared signal bus built on top of `tokio::broadcast`.
///
/// All instances on the same page share one bus; cloning is cheap and every
/// clone publishes into the same channel.
#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<SignalEnvelope>,
    backlog: Arc<Mutex<Backlog>>,
}

impl SignalBus {
    /// Construct a bus with a custom channel and backlog capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            backlog: Arc::new(Mutex::new(Backlog {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                next_id: 1,
            })),
        }
    }

    /// Construct a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BACKLOG_CAPACITY)
    }

    /// Subscribe to signals published after this call.
    #[must_use]
    pub fn subscribe(&self) -> SignalStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Publish a signal to all subscribers, returning the assigned id.
    pub fn publish(&self, signal: Signal) -> SignalId {
        let envelope = self.lock_backlog().record(signal);
        let id = envelope.id;
        let _ = self.sender.send(envelope);
        id
    }

    /// Id of the most recently published signal.
    #[must_use]
    pub fn last_signal_id(&self) -> Option<SignalId> {
        self.lock_backlog().entries.back().map(|env| env.id)
    }

    /// Envelopes published after the given id, oldest first.
    ///
    /// Bounded by the backlog capacity: signals evicted from the ring are
    /// gone for good, which is why subscribers recover promptly on lag.
    #[must_use]
    pub fn backlog_since(&self, id: SignalId) -> Vec<SignalEnvelope> {
        self.lock_backlog()
            .entries
            .iter()
            .filter(|env| env.id > id)
            .cloned()
            .collect()
    }

    fn lock_backlog(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
