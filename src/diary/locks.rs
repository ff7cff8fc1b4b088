//! Per-(user, date) lock registry
//!
//! Serializes the read-modify-write of one diary within this process. Entries are
//! created on demand and dropped again once no caller holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::debug;

type DiaryKey = (String, NaiveDate);

#[derive(Default)]
pub struct DiaryLocks {
    locks: Mutex<HashMap<DiaryKey, Arc<Mutex<()>>>>,
}

/// A poisoned lock only means another caller panicked mid-update; the guarded data is `()`
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drops the registry entry once the last holder or waiter is gone
struct Release<'a> {
    registry: &'a DiaryLocks,
    key: DiaryKey,
    lock: Arc<Mutex<()>>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut locks = lock_recovering(&self.registry.locks);
        // Registry plus our own handle: nobody else is holding or waiting
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

impl DiaryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for (user_id, date)
    pub fn with_lock<T>(&self, user_id: &str, date: NaiveDate, f: impl FnOnce() -> T) -> T {
        let key = (user_id.to_string(), date);

        let lock = {
            let mut locks = lock_recovering(&self.locks);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        // Declared before the guard so it drops after it, on return or unwind
        let release = Release { registry: self, key, lock };
        let _guard = lock_recovering(&release.lock);
        debug!(user_id, %date, "Acquired diary lock");
        f()
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        lock_recovering(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_registry_empties_after_use() {
        let locks = DiaryLocks::new();
        let value = locks.with_lock("u1", date(), || 42);
        assert_eq!(value, 42);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = Arc::new(DiaryLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..20 {
                        locks.with_lock("u1", date(), || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_panicking_caller_does_not_wedge_key() {
        let locks = Arc::new(DiaryLocks::new());
        let cloned = Arc::clone(&locks);
        let result = thread::spawn(move || {
            cloned.with_lock("u1", date(), || panic!("boom"));
        })
        .join();
        assert!(result.is_err());
        assert!(locks.is_empty());

        assert_eq!(locks.with_lock("u1", date(), || "ok"), "ok");
        assert!(locks.is_empty());
    }
}
