//! Process-local registry of pending expiry timers.
//!
//! One entry per suspension id, holding the spawned wake-up task and its
//! wall-clock fire time. Entries are never persisted; the recovery
//! coordinator rebuilds the registry from the store on every process start.
//!
//! Cancellation here is best-effort only. A callback that the runtime has
//! already dequeued may still run after `cancel` returns; the store's
//! conditional deactivate is what actually breaks the race.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use warden_core::SuspensionId;

struct TimerEntry {
    generation: u64,
    fire_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

/// Maps suspension ids to cancellable scheduled wake-ups.
#[derive(Default)]
pub struct TimerRegistry {
    timers: Arc<Mutex<HashMap<SuspensionId, TimerEntry>>>,
    next_generation: AtomicU64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrange for `callback` to run once when `fire_at` is reached.
    ///
    /// Replace semantics: an existing timer for the same id is cancelled
    /// first, so there are never two live timers for one suspension. The
    /// callback always runs on a spawned task, even when the fire time is
    /// already in the past; live-created and recovered timers share one
    /// code path.
    pub fn schedule(&self, id: SuspensionId, fire_at: DateTime<Utc>, callback: BoxFuture<'static, ()>) {
        let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);

        // Hold the lock across spawn + insert so the task's own removal
        // (which takes the same lock) cannot observe a half-registered
        // entry.
        let mut guard = self.timers.lock();
        if let Some(previous) = guard.remove(&id) {
            previous.handle.abort();
            debug!(%id, "replaced pending timer");
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut timers = timers.lock();
                // Only drop our own entry; a newer timer for this id owns
                // the slot now.
                if timers.get(&id).is_some_and(|entry| entry.generation == generation) {
                    timers.remove(&id);
                }
            }
            callback.await;
        });

        guard.insert(
            id,
            TimerEntry {
                generation,
                fire_at,
                handle,
            },
        );
        debug!(%id, %fire_at, "expiry timer scheduled");
    }

    /// Cancel any pending timer for `id`. No-op if absent; benign if the
    /// callback already fired.
    pub fn cancel(&self, id: SuspensionId) {
        if let Some(entry) = self.timers.lock().remove(&id) {
            entry.handle.abort();
            debug!(%id, "expiry timer cancelled");
        }
    }

    /// Cancel every pending timer. Used at shutdown.
    pub fn clear_all(&self) {
        let mut guard = self.timers.lock();
        let count = guard.len();
        for (_, entry) in guard.drain() {
            entry.handle.abort();
        }
        debug!(count, "cleared all pending timers");
    }

    /// Whether a timer is pending for `id`.
    pub fn contains(&self, id: SuspensionId) -> bool {
        self.timers.lock().contains_key(&id)
    }

    /// Scheduled fire time for `id`, if a timer is pending.
    pub fn fire_at(&self, id: SuspensionId) -> Option<DateTime<Utc>> {
        self.timers.lock().get(&id).map(|entry| entry.fire_at)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    /// True when no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for (_, entry) in self.timers.lock().drain() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_callback(counter: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn fires_once_and_removes_entry() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SuspensionId::new(1);

        registry.schedule(
            id,
            Utc::now() + chrono::Duration::milliseconds(30),
            counter_callback(&fired),
        );
        assert!(registry.contains(id));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn past_fire_time_still_runs_asynchronously() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SuspensionId::new(2);

        registry.schedule(
            id,
            Utc::now() - chrono::Duration::seconds(5),
            counter_callback(&fired),
        );
        // Never invoked synchronously inside schedule
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_firing() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SuspensionId::new(3);

        registry.schedule(
            id,
            Utc::now() + chrono::Duration::milliseconds(40),
            counter_callback(&fired),
        );
        registry.cancel(id);
        assert!(!registry.contains(id));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reports_fire_time_while_pending() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SuspensionId::new(6);
        let fire_at = Utc::now() + chrono::Duration::hours(1);

        registry.schedule(id, fire_at, counter_callback(&fired));
        assert_eq!(registry.fire_at(id), Some(fire_at));

        registry.cancel(id);
        assert_eq!(registry.fire_at(id), None);
    }

    #[tokio::test]
    async fn cancel_of_absent_id_is_noop() {
        let registry = TimerRegistry::new();
        registry.cancel(SuspensionId::new(99));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn reschedule_replaces_pending_timer() {
        let registry = TimerRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let id = SuspensionId::new(4);

        registry.schedule(
            id,
            Utc::now() + chrono::Duration::milliseconds(40),
            counter_callback(&first),
        );
        registry.schedule(
            id,
            Utc::now() + chrono::Duration::milliseconds(40),
            counter_callback(&second),
        );
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn clear_all_cancels_everything() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for raw in 0..5 {
            registry.schedule(
                SuspensionId::new(raw),
                Utc::now() + chrono::Duration::milliseconds(40),
                counter_callback(&fired),
            );
        }
        assert_eq!(registry.len(), 5);

        registry.clear_all();
        assert!(registry.is_empty());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
