//! Inbound change watching with lag recovery and a poll fallback.
//!
//! Bus signals cover contexts that share the in-process channel. Contexts
//! that only share storage never see those, so the watcher also polls the
//! updated-timestamp key and synthesizes a change signal when it advances.
//! When the broadcast channel drops signals faster than the watcher drains
//! them, the missed ones are recovered from the bus backlog by id.

use crate::error::StoreResult;
use crate::tier::StorageTier;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::debug;
use uuid::Uuid;
use xwui_events::{Signal, SignalBus, SignalId, SignalStream, updated_key};

/// Watches for changes to one storage key.
pub struct StoreWatcher {
    bus: SignalBus,
    stream: SignalStream,
    large: Arc<dyn StorageTier>,
    storage_key: String,
    updated_key: String,
    poll_interval: Duration,
    last_seen: Option<i64>,
    cursor: SignalId,
    pending: VecDeque<Signal>,
}

impl StoreWatcher {
    /// Start watching a storage key.
    ///
    /// The current updated-timestamp is recorded at construction so the
    /// poll fallback only reports changes that happen afterwards; likewise
    /// only signals published after this call are delivered.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::Backend`] when the large tier fails to
    /// read the updated-timestamp key.
    pub async fn start(
        bus: &SignalBus,
        large: Arc<dyn StorageTier>,
        storage_key: impl Into<String>,
        poll_interval: Duration,
    ) -> StoreResult<Self> {
        let storage_key = storage_key.into();
        let updated = updated_key(&storage_key);
        let last_seen = read_timestamp(large.as_ref(), &updated).await?;
        Ok(Self {
            bus: bus.clone(),
            stream: bus.subscribe(),
            large,
            storage_key,
            updated_key: updated,
            poll_interval,
            last_seen,
            cursor: bus.last_signal_id().unwrap_or(0),
            pending: VecDeque::new(),
        })
    }

    /// Next change affecting the watched storage key.
    ///
    /// Returns `None` when the signal bus is gone and no poll fallback
    /// progress can be made.
    pub async fn next(&mut self) -> Option<Signal> {
        loop {
            if let Some(signal) = self.pending.pop_front() {
                if let Signal::StorageUpdated { timestamp_ms, .. } = &signal {
                    self.record(*timestamp_ms);
                }
                return Some(signal);
            }
            tokio::select! {
                item = self.stream.next() => match item {
                    Some(Ok(envelope)) => {
                        if envelope.id <= self.cursor {
                            // Already handed out via backlog recovery.
                            continue;
                        }
                        self.cursor = envelope.id;
                        if envelope.signal.storage_key() != Some(self.storage_key.as_str()) {
                            continue;
                        }
                        if let Signal::StorageUpdated { timestamp_ms, .. } = &envelope.signal {
                            self.record(*timestamp_ms);
                        }
                        return Some(envelope.signal);
                    }
                    Some(Err(err)) => {
                        debug!(error = %err, "signal stream lagged, recovering from backlog");
                        self.recover();
                    }
                    None => return None,
                },
                () = tokio::time::sleep(self.poll_interval) => {
                    let timestamp = match read_timestamp(self.large.as_ref(), &self.updated_key).await {
                        Ok(timestamp) => timestamp,
                        Err(err) => {
                            debug!(error = %err, "poll fallback read failed");
                            continue;
                        }
                    };
                    if let Some(timestamp_ms) = timestamp {
                        if self.last_seen.is_none_or(|seen| timestamp_ms > seen) {
                            self.record(timestamp_ms);
                            return Some(Signal::StorageUpdated {
                                storage_key: self.storage_key.clone(),
                                timestamp_ms,
                                origin: Uuid::nil(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn recover(&mut self) {
        for envelope in self.bus.backlog_since(self.cursor) {
            self.cursor = envelope.id;
            if envelope.signal.storage_key() == Some(self.storage_key.as_str()) {
                self.pending.push_back(envelope.signal);
            }
        }
    }

    fn record(&mut self, timestamp_ms: i64) {
        if self.last_seen.is_none_or(|seen| timestamp_ms > seen) {
            self.last_seen = Some(timestamp_ms);
        }
    }
}

async fn read_timestamp(tier: &dyn StorageTier, key: &str) -> StoreResult<Option<i64>> {
    Ok(tier
        .read(key)
        .await?
        .and_then(|raw| raw.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::MemoryTier;
    use std::time::Duration;
    use tokio::time::timeout;

    const KEY: &str = "xwui-style-testers";

    async fn watcher(bus: &SignalBus, large: Arc<MemoryTier>) -> StoreWatcher {
        StoreWatcher::start(bus, large, KEY, Duration::from_millis(10))
            .await
            .expect("start watcher")
    }

    fn storage_updated(timestamp_ms: i64) -> Signal {
        Signal::StorageUpdated {
            storage_key: KEY.into(),
            timestamp_ms,
            origin: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn delivers_bus_signals_for_the_watched_key() {
        let bus = SignalBus::new();
        let mut watcher = watcher(&bus, Arc::new(MemoryTier::new())).await;

        bus.publish(Signal::InstanceSync {
            storage_key: "unrelated".into(),
            origin: Uuid::new_v4(),
        });
        bus.publish(Signal::InstanceSync {
            storage_key: KEY.into(),
            origin: Uuid::new_v4(),
        });

        let signal = timeout(Duration::from_secs(1), watcher.next())
            .await
            .expect("within deadline")
            .expect("signal");
        assert_eq!(signal.storage_key(), Some(KEY));
    }

    #[tokio::test]
    async fn lagged_watcher_recovers_missed_signals_without_duplicates() {
        // Channel and backlog both hold two entries; four publishes force
        // the subscriber to lag and lose the first two.
        let bus = SignalBus::with_capacity(2);
        let mut watcher = watcher(&bus, Arc::new(MemoryTier::new())).await;

        for timestamp_ms in 1..=4 {
            bus.publish(storage_updated(timestamp_ms));
        }

        let mut seen = Vec::new();
        while let Ok(Some(signal)) = timeout(Duration::from_millis(100), watcher.next()).await {
            if let Signal::StorageUpdated { timestamp_ms, .. } = signal {
                seen.push(timestamp_ms);
            }
        }
        assert_eq!(seen, vec![3, 4]);
    }

    #[tokio::test]
    async fn poll_fallback_detects_storage_only_writes() {
        let bus = SignalBus::new();
        let large = Arc::new(MemoryTier::new());
        let mut watcher = watcher(&bus, large.clone()).await;

        large
            .write(&updated_key(KEY), "1700000000000")
            .await
            .expect("write updated key");

        let signal = timeout(Duration::from_secs(1), watcher.next())
            .await
            .expect("within deadline")
            .expect("signal");
        assert!(matches!(
            signal,
            Signal::StorageUpdated { timestamp_ms: 1_700_000_000_000, .. }
        ));
    }

    #[tokio::test]
    async fn preexisting_timestamp_is_not_reported() {
        let bus = SignalBus::new();
        let large = Arc::new(MemoryTier::new());
        large
            .write(&updated_key(KEY), "1700000000000")
            .await
            .expect("seed updated key");
        let mut watcher = watcher(&bus, large).await;

        let outcome = timeout(Duration::from_millis(50), watcher.next()).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn stale_timestamps_do_not_refire() {
        let bus = SignalBus::new();
        let large = Arc::new(MemoryTier::new());
        let mut watcher = watcher(&bus, large.clone()).await;

        large
            .write(&updated_key(KEY), "100")
            .await
            .expect("write updated key");
        let _ = timeout(Duration::from_secs(1), watcher.next())
            .await
            .expect("within deadline");

        // Rewriting the same timestamp must not produce another signal.
        large
            .write(&updated_key(KEY), "100")
            .await
            .expect("rewrite updated key");
        let outcome = timeout(Duration::from_millis(50), watcher.next()).await;
        assert!(outcome.is_err());
    }
}
