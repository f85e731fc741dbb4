//! Per-key reader/writer locks for the file store.
//!
//! The registry maps an escaped key to its lock. Finding or creating a lock
//! happens under one mutex, so two callers asking for a key that has no lock
//! yet always end up with the same one.
//!
//! The registry only keeps weak references. A lock lives as long as someone
//! holds it; entries whose lock is gone are pruned once the map has doubled
//! since the last prune, so memory follows the number of keys in use rather
//! than every key ever touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Registry size below which dead entries are never pruned.
const MIN_PRUNE_AT: usize = 64;

/// Shared lock for one escaped key.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyLock(Arc<RwLock<()>>);

impl KeyLock {
    /// Acquires the lock for reading.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the lock for writing.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &KeyLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug)]
struct Slots {
    locks: HashMap<String, Weak<RwLock<()>>>,
    prune_at: usize,
}

/// Find-or-create registry of [`KeyLock`]s.
#[derive(Debug)]
pub(crate) struct LockRegistry {
    slots: Mutex<Slots>,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self {
            slots: Mutex::new(Slots {
                locks: HashMap::new(),
                prune_at: MIN_PRUNE_AT,
            }),
        }
    }
}

impl LockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `escaped_key`, creating it if nobody holds one.
    pub(crate) fn lock_for(&self, escaped_key: &str) -> KeyLock {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(lock) = slots.locks.get(escaped_key).and_then(Weak::upgrade) {
            return KeyLock(lock);
        }

        let lock = KeyLock::default();
        slots
            .locks
            .insert(escaped_key.to_owned(), Arc::downgrade(&lock.0));

        if slots.locks.len() >= slots.prune_at {
            slots.locks.retain(|_, weak| weak.strong_count() > 0);
            slots.prune_at = (slots.locks.len() * 2).max(MIN_PRUNE_AT);
        }

        lock
    }

    /// Number of registry entries, live or not yet pruned.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .locks
            .len()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_key_same_lock() {
        let registry = LockRegistry::new();
        let a = registry.lock_for("a");
        let again = registry.lock_for("a");
        let b = registry.lock_for("b");

        assert!(a.same_as(&again));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_concurrent_creation_yields_one_lock() {
        let registry = Arc::new(LockRegistry::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || registry.lock_for("shared")));
        }

        let locks: Vec<KeyLock> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(locks.windows(2).all(|pair| pair[0].same_as(&pair[1])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unused_locks_are_pruned() {
        let registry = LockRegistry::new();
        let held = registry.lock_for("held");

        for i in 0..1000 {
            drop(registry.lock_for(&format!("k{}", i)));
        }

        assert!(registry.len() < MIN_PRUNE_AT * 2);
        assert!(held.same_as(&registry.lock_for("held")));
    }

    #[test]
    fn test_writer_excludes_same_key_only() {
        let registry = Arc::new(LockRegistry::new());
        let lock = registry.lock_for("a");
        let guard = lock.write();

        let (tx, rx) = mpsc::channel();
        let other = Arc::clone(&registry);
        thread::spawn(move || {
            let b = other.lock_for("b");
            let _b = b.write();
            tx.send("b").unwrap();
            let a = other.lock_for("a");
            let _a = a.read();
            tx.send("a").unwrap();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "b");
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        drop(guard);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "a");
    }
}
