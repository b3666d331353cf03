use crate::{SessionStore, StorageSubscription};
use std::sync::Arc;
use std::time::Duration;

/// Turns writes other processes make to the session store into storage
/// change notifications, for hosts that have no native storage event.
pub struct StoreWatcher {
    store: Arc<dyn SessionStore>,
    key: String,
    interval: Duration,
    last_seen: Option<String>,
}

impl StoreWatcher {
    /// Start watching from the value currently stored, so only later writes
    /// are reported.
    pub fn new(store: Arc<dyn SessionStore>, key: impl Into<String>, interval: Duration) -> Self {
        let key = key.into();
        let last_seen = store.get(&key).unwrap_or_else(|err| {
            tracing::warn!("session store unreadable at watch start: {err}");
            None
        });
        Self {
            store,
            key,
            interval,
            last_seen,
        }
    }

    /// The new raw value if it differs from the last one seen.
    pub fn poll(&mut self) -> Option<Option<String>> {
        let current = match self.store.get(&self.key) {
            Ok(current) => current,
            Err(err) => {
                tracing::debug!("session store poll failed: {err}");
                return None;
            }
        };

        if current == self.last_seen {
            return None;
        }
        self.last_seen = current.clone();
        Some(current)
    }

    /// Poll until the subscription stops accepting deliveries.
    pub async fn run(mut self, subscription: StorageSubscription) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !subscription.is_active() {
                break;
            }
            if let Some(value) = self.poll() {
                if !subscription.deliver(self.key.clone(), value) {
                    break;
                }
            }
        }
        tracing::debug!(key = %self.key, "store watcher stopped");
    }
}
