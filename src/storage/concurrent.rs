//! In-process store on a concurrent map.
//!
//! Same contract as [`MapStore`](crate::storage::MapStore), but backed by
//! `DashMap`: every insert, lookup and removal is individually atomic, so data
//! access takes no store-wide lock. Reads only contend with writes that land in
//! the same internal shard.
//!
//! Inserts hold a shared gate that `close` takes exclusively, so a write
//! never lands in a map that `close` has already cleared.
//!
//! The sweep visits the map shard by shard. Items inserted or removed by
//! other callers while it runs may or may not be seen by it; no item is ever
//! corrupted.

use crate::codec::{Codec, JsonCodec};
use crate::config::MapConfig;
use crate::error::{Result, StoreError};
use crate::storage::expiry::{self, ExpirySweeper};
use crate::storage::{Item, Store};
use crate::validate::{check_key, check_value};
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;
use tracing::info;

/// A store keeping encoded items in a `DashMap`.
pub struct ConcurrentMapStore<C: Codec = JsonCodec> {
    items: DashMap<String, Item<Bytes>>,
    codec: C,
    closed: AtomicBool,
    gate: RwLock<()>,
    sweeper: ExpirySweeper,
}

impl<C: Codec> std::fmt::Debug for ConcurrentMapStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentMapStore")
            .field("items", &self.items.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C: Codec> ConcurrentMapStore<C> {
    /// Creates a new concurrent map store and starts its expiry sweeper.
    ///
    /// Must be called within a Tokio runtime.
    pub fn open(config: MapConfig<C>) -> Result<Arc<Self>> {
        let interval = config.sweep_interval();

        let store = expiry::start_with_sweeper(interval, |sweeper| Self {
            items: DashMap::new(),
            codec: config.codec,
            closed: AtomicBool::new(false),
            gate: RwLock::new(()),
            sweeper,
        })?;

        info!("Concurrent map store opened");
        Ok(store)
    }

    /// Returns the number of held items, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shared side of the close gate, taken by every insert.
    fn admit(&self) -> Result<RwLockReadGuard<'_, ()>> {
        let gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        self.ensure_open()?;
        Ok(gate)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl<C: Codec> Store for ConcurrentMapStore<C> {
    const KIND: &'static str = "concurrent-map";

    fn set_ex<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        check_key(key)?;
        check_value(value)?;
        self.ensure_open()?;

        let data = self.codec.marshal(value).map_err(StoreError::Encode)?;
        let item = Item::new(Bytes::from(data), ttl)?;

        let _gate = self.admit()?;
        self.items.insert(key.to_owned(), item);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        check_key(key)?;
        self.ensure_open()?;

        // The shard guard inside `Ref` must be gone before decoding
        let data = match self.items.get(key) {
            None => return Ok(None),
            Some(item) if item.is_expired() => None,
            Some(item) => Some(item.data.clone()),
        };

        let Some(data) = data else {
            self.items.remove_if(key, |_, item| item.is_expired());
            return Ok(None);
        };

        self.codec
            .unmarshal(&data)
            .map(Some)
            .map_err(StoreError::Decode)
    }

    fn has(&self, key: &str) -> bool {
        if check_key(key).is_err() || self.ensure_open().is_err() {
            return false;
        }

        self.items
            .get(key)
            .is_some_and(|item| !item.is_expired())
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.ensure_open()?;

        self.items.remove(key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.items.clear();
        self.items.shrink_to_fit();
        drop(gate);

        self.sweeper.stop();

        info!("Concurrent map store closed");
        Ok(())
    }

    fn gc(&self) -> Result<usize> {
        self.ensure_open()?;

        let now = Utc::now();
        let mut reclaimed = 0;

        self.items.retain(|_, item| {
            let keep = !item.is_expired_at(now);
            if !keep {
                reclaimed += 1;
            }
            keep
        });

        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn open() -> Arc<ConcurrentMapStore> {
        ConcurrentMapStore::open(MapConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = open();
        store.set("name", "Ariz").unwrap();
        assert_eq!(
            store.get::<String>("name").unwrap().as_deref(),
            Some("Ariz")
        );
        assert_eq!(store.get::<String>("missing").unwrap(), None);
    }

    #[tokio::test]
    async fn test_validation() {
        let store = open();
        assert!(matches!(store.set("", &1), Err(StoreError::InvalidKey)));
        assert!(matches!(store.set("k", &()), Err(StoreError::InvalidValue)));
        assert!(matches!(store.get::<i32>(""), Err(StoreError::InvalidKey)));
        assert!(matches!(store.delete(""), Err(StoreError::InvalidKey)));
        assert!(!store.has(""));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_has_ignores_decodability() {
        let store = open();
        store.set("k", &[1, 2, 3]).unwrap();
        assert!(matches!(store.get::<bool>("k"), Err(StoreError::Decode(_))));
        assert!(store.has("k"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = open();
        store.set("k", &1).unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(!store.has("k"));
    }

    #[tokio::test]
    async fn test_lazy_expiry_on_get() {
        let store = open();
        store.set_ex("b", &2, Duration::from_millis(20)).unwrap();
        assert_eq!(store.get::<i32>("b").unwrap(), Some(2));

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!store.has("b"));
        assert_eq!(store.get::<i32>("b").unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_gc_removes_only_expired() {
        let store = open();
        store.set_ex("short", &1, Duration::from_millis(10)).unwrap();
        store.set("forever", &2).unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.gc().unwrap(), 1);
        assert_eq!(store.gc().unwrap(), 0);
        assert_eq!(store.get::<i32>("forever").unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_sweeper_reclaims_in_background() {
        let config = MapConfig::new().with_sweep_interval(Duration::from_millis(10));
        let store = ConcurrentMapStore::open(config).unwrap();

        for i in 0..100 {
            store
                .set_ex(&format!("key{}", i), &i, Duration::from_millis(20))
                .unwrap();
        }
        store.set("persistent", &true).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.len(), 1);
        assert!(store.has("persistent"));
    }

    #[tokio::test]
    async fn test_gc_alongside_writers() {
        let store = open();
        let mut handles = vec![];

        for t in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    let key = format!("w{}:{}", t, i);
                    if i % 2 == 0 {
                        store.set_ex(&key, &i, Duration::from_nanos(1)).unwrap();
                    } else {
                        store.set(&key, &i).unwrap();
                    }
                }
            }));
        }

        let sweeper = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..20 {
                    store.gc().unwrap();
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        sweeper.join().unwrap();

        thread::sleep(Duration::from_millis(5));
        store.gc().unwrap();

        assert_eq!(store.len(), 4 * 250);
        assert_eq!(store.get::<i32>("w0:1").unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_close() {
        let store = open();
        store.set("k", &1).unwrap();
        store.close().unwrap();

        assert!(store.sweeper.is_stopped());
        assert!(store.is_empty());
        assert!(!store.has("k"));
        assert!(matches!(store.set("k", &1), Err(StoreError::Closed)));
        assert!(matches!(store.get::<i32>("k"), Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn test_close_during_writes() {
        for _ in 0..50 {
            let store = open();
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0.. {
                            if store.set(&format!("w{}:{}", t, i), &i).is_err() {
                                break;
                            }
                        }
                    })
                })
                .collect();

            thread::sleep(Duration::from_micros(200));
            store.close().unwrap();

            for handle in handles {
                handle.join().unwrap();
            }
            assert!(store.is_empty());
        }
    }

    #[tokio::test]
    async fn test_scenario() {
        let store = open();

        store.set("a", &1).unwrap();
        assert_eq!(store.get::<i32>("a").unwrap(), Some(1));

        store.set_ex("b", &2, Duration::from_secs(1)).unwrap();
        assert_eq!(store.get::<i32>("b").unwrap(), Some(2));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.get::<i32>("b").unwrap(), None);

        store.delete("missing").unwrap();
        assert!(store.has("a"));
        assert!(!store.has("missing"));
    }
}
