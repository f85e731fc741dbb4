//! In-process map store guarded by a single reader/writer lock.
//!
//! ## Locking
//!
//! ```text
//! set / set_ex / delete / gc   -> exclusive lock on the whole map
//! get / has                    -> shared lock, released before decoding
//! ```
//!
//! The sweep holds the exclusive lock for its whole duration, blocking every
//! reader and writer meanwhile. That is fine for small, bounded keysets, which
//! is what this backend is for; use [`ConcurrentMapStore`] for anything
//! larger.
//!
//! [`ConcurrentMapStore`]: crate::storage::ConcurrentMapStore

use crate::codec::{Codec, JsonCodec};
use crate::config::MapConfig;
use crate::error::{Result, StoreError};
use crate::storage::expiry::{self, ExpirySweeper};
use crate::storage::{Item, Store};
use crate::validate::{check_key, check_value};
use bytes::Bytes;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::info;

/// A store keeping encoded items in a `HashMap` behind one `RwLock`.
///
/// # Example
///
/// ```
/// use ttlkv::config::MapConfig;
/// use ttlkv::storage::{MapStore, Store};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ttlkv::Result<()> {
/// let store = MapStore::open(MapConfig::default())?;
/// store.set("visits", &3u32)?;
/// assert_eq!(store.get::<u32>("visits")?, Some(3));
/// # Ok(())
/// # }
/// ```
pub struct MapStore<C: Codec = JsonCodec> {
    /// Encoded items by key
    items: RwLock<HashMap<String, Item<Bytes>>>,

    /// Value encoding
    codec: C,

    /// Set by `close()`
    closed: AtomicBool,

    /// Handle to the background sweep
    sweeper: ExpirySweeper,
}

impl<C: Codec> std::fmt::Debug for MapStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapStore")
            .field("items", &self.read().len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C: Codec> MapStore<C> {
    /// Creates a new map store and starts its expiry sweeper.
    ///
    /// Must be called within a Tokio runtime.
    pub fn open(config: MapConfig<C>) -> Result<Arc<Self>> {
        let interval = config.sweep_interval();

        let store = expiry::start_with_sweeper(interval, |sweeper| Self {
            items: RwLock::new(HashMap::new()),
            codec: config.codec,
            closed: AtomicBool::new(false),
            sweeper,
        })?;

        info!("Map store opened");
        Ok(store)
    }

    /// Returns the number of held items, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns the remaining lifetime of a live item.
    ///
    /// `None` if the key is missing or expired, `Some(None)` if the item
    /// never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let items = self.read();
        items
            .get(key)
            .filter(|item| !item.is_expired())
            .map(Item::remaining)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Item<Bytes>>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Item<Bytes>>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes `key` if it is still expired under the write lock. Returns the
    /// payload if another writer replaced the item in the meantime.
    fn evict_expired(&self, key: &str) -> Option<Bytes> {
        let mut items = self.write();
        match items.get(key) {
            Some(item) if item.is_expired() => {
                items.remove(key);
                None
            }
            Some(item) => Some(item.data.clone()),
            None => None,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl<C: Codec> Store for MapStore<C> {
    const KIND: &'static str = "map";

    fn set_ex<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        check_key(key)?;
        check_value(value)?;
        self.ensure_open()?;

        let data = self.codec.marshal(value).map_err(StoreError::Encode)?;
        let item = Item::new(Bytes::from(data), ttl)?;

        // `close` flips the flag under this lock
        let mut items = self.write();
        self.ensure_open()?;
        items.insert(key.to_owned(), item);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        check_key(key)?;
        self.ensure_open()?;

        // Clone the payload under the read lock (cheap, `Bytes` is refcounted)
        // and decode after releasing it so writers aren't held up.
        let data = {
            let items = self.read();
            match items.get(key) {
                None => return Ok(None),
                Some(item) if item.is_expired() => None,
                Some(item) => Some(item.data.clone()),
            }
        };

        let data = match data {
            Some(data) => data,
            None => match self.evict_expired(key) {
                Some(data) => data,
                None => return Ok(None),
            },
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

        self.read()
            .get(key)
            .is_some_and(|item| !item.is_expired())
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.ensure_open()?;

        let mut items = self.write();
        self.ensure_open()?;
        items.remove(key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut items = self.write();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        items.clear();
        items.shrink_to_fit();
        drop(items);

        self.sweeper.stop();
        info!("Map store closed");
        Ok(())
    }

    fn gc(&self) -> Result<usize> {
        self.ensure_open()?;

        let now = Utc::now();
        let mut items = self.write();
        self.ensure_open()?;
        let before = items.len();

        items.retain(|_, item| !item.is_expired_at(now));

        Ok(before - items.len())
    }
}
