//! Background Expiry Sweeper
//!
//! Reads already treat expired entries as absent, but an entry nobody reads
//! again would sit in its shard forever. The sweeper removes those. It only
//! affects memory: every read answers the same with or without it.
//!
//! Each pass calls [`StorageEngine::cleanup_expired`] and then picks the
//! next pause from how much of the store the pass removed:
//!
//! ```text
//!   removed / entries  > 25%   ──>  pause halves    (floor: min_interval)
//!   nothing removed            ──>  pause doubles   (ceiling: max_interval)
//!   otherwise                  ──>  pause unchanged
//! ```

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, trace};

/// Share of entries removed in one pass above which sweeping speeds up.
const BUSY_PASS_RATIO: f64 = 0.25;

/// Timing for the expiry sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryConfig {
    /// Pause before the first pass
    pub interval: Duration,
    /// Shortest pause between passes
    pub min_interval: Duration,
    /// Longest pause between passes
    pub max_interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
        }
    }
}

impl ExpiryConfig {
    /// The pause after a pass that removed `removed` of `entries` entries.
    fn next_interval(&self, current: Duration, removed: u64, entries: u64) -> Duration {
        if removed == 0 {
            if entries == 0 {
                return current;
            }
            return (current * 2).min(self.max_interval);
        }

        if removed as f64 / entries as f64 > BUSY_PASS_RATIO {
            (current / 2).max(self.min_interval)
        } else {
            current
        }
    }
}

/// Handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    store: &'static str,
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns a sweeper for `engine` on the current runtime. `store` names
    /// the engine in log output.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use rqldb::storage::{Expiry, ExpiryConfig, ExpirySweeper, StorageEngine};
    /// use bytes::Bytes;
    /// use std::sync::Arc;
    ///
    /// let engine: Arc<StorageEngine<Bytes>> = Arc::new(StorageEngine::new(Expiry::Never));
    /// let sweeper = ExpirySweeper::start("data", Arc::clone(&engine), ExpiryConfig::default());
    ///
    /// drop(sweeper); // stops the task
    /// ```
    pub fn start<V>(store: &'static str, engine: Arc<StorageEngine<V>>, config: ExpiryConfig) -> Self
    where
        V: Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(run(store, engine, config, shutdown_rx));
        info!(store = store, interval_ms = config.interval.as_millis(), "Expiry sweeper started");

        Self { store, shutdown_tx }
    }

    /// Signals the task to stop. Also done on drop.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!(store = self.store, "Expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<V>(
    store: &'static str,
    engine: Arc<StorageEngine<V>>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut pause = config.interval;

    loop {
        tokio::select! {
            _ = time::sleep(pause) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!(store = store, "Expiry sweeper exiting");
                    return;
                }
            }
        }

        let entries = engine.len();
        let removed = engine.cleanup_expired();
        let next = config.next_interval(pause, removed, entries);

        if removed > 0 {
            debug!(
                store = store,
                removed = removed,
                remaining = engine.len(),
                next_ms = next.as_millis(),
                "Swept expired entries"
            );
        } else if next != pause {
            trace!(store = store, next_ms = next.as_millis(), "Idle pass, backing off");
        }

        pause = next;
    }
}

/// Starts a sweeper for `engine` with the default timing.
pub fn start_expiry_sweeper<V>(store: &'static str, engine: Arc<StorageEngine<V>>) -> ExpirySweeper
where
    V: Send + Sync + 'static,
{
    ExpirySweeper::start(store, engine, ExpiryConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Expiry;
    use bytes::Bytes;

    fn engine() -> Arc<StorageEngine<Bytes>> {
        Arc::new(StorageEngine::new(Expiry::Never))
    }

    fn fast() -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[test]
    fn test_interval_halves_on_busy_pass() {
        let config = ExpiryConfig::default();
        let current = Duration::from_millis(100);

        assert_eq!(config.next_interval(current, 50, 100), Duration::from_millis(50));
        assert_eq!(
            config.next_interval(Duration::from_millis(15), 90, 100),
            config.min_interval
        );
    }

    #[test]
    fn test_interval_doubles_when_nothing_expired() {
        let config = ExpiryConfig::default();

        assert_eq!(
            config.next_interval(Duration::from_millis(100), 0, 10),
            Duration::from_millis(200)
        );
        assert_eq!(
            config.next_interval(Duration::from_millis(800), 0, 10),
            config.max_interval
        );
    }

    #[test]
    fn test_interval_holds_otherwise() {
        let config = ExpiryConfig::default();
        let current = Duration::from_millis(100);

        // Some removed, but not a busy pass
        assert_eq!(config.next_interval(current, 1, 100), current);
        // Empty store
        assert_eq!(config.next_interval(current, 0, 0), current);
    }

    #[tokio::test]
    async fn test_sweeper_removes_unread_entries() {
        let engine = engine();

        for i in 0..10 {
            engine.set(
                Bytes::from(format!("session:{}", i)),
                Bytes::from("token"),
                Some(Expiry::from_millis(50)),
            );
        }
        engine.set(Bytes::from("config"), Bytes::from("v"), None);
        assert_eq!(engine.len(), 11);

        let _sweeper = ExpirySweeper::start("data", Arc::clone(&engine), fast());
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(engine.len(), 1);
        assert_eq!(engine.stats().expired, 10);
        assert!(engine.exists(b"config"));
    }

    #[tokio::test]
    async fn test_dropped_sweeper_leaves_lazy_expiry() {
        let engine = engine();

        {
            let _sweeper = ExpirySweeper::start("data", Arc::clone(&engine), fast());
            time::sleep(Duration::from_millis(30)).await;
        }

        engine.set(Bytes::from("k"), Bytes::from("v"), Some(Expiry::from_millis(10)));
        time::sleep(Duration::from_millis(100)).await;

        // Still stored, yet a read reports it absent and removes it
        assert_eq!(engine.len(), 1);
        assert!(engine.get(b"k").is_none());
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_keeps_up_with_mass_expiry() {
        let engine = engine();

        for i in 0..1000 {
            engine.set(
                Bytes::from(format!("k{}", i)),
                Bytes::from("v"),
                Some(Expiry::from_millis(20)),
            );
        }

        let config = ExpiryConfig {
            interval: Duration::from_millis(50),
            min_interval: Duration::from_millis(5),
            max_interval: Duration::from_secs(1),
        };
        let _sweeper = ExpirySweeper::start("data", Arc::clone(&engine), config);

        time::sleep(Duration::from_millis(300)).await;
        assert!(engine.is_empty());
    }
}
