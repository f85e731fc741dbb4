//! Storage Module
//!
//! This module provides the store backends of ttlkv and the [`Store`]
//! contract they all implement.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐ ┌──────────────────────┐ ┌──────────────────────┐
//! │    MapStore      │ │ ConcurrentMapStore   │ │      FileStore       │
//! │ RwLock<HashMap>  │ │ DashMap (sharded)    │ │ one file per key     │
//! │ one lock for all │ │ no caller-held lock  │ │ one RwLock per key   │
//! └────────▲─────────┘ └──────────▲───────────┘ └──────────▲───────────┘
//!          │                      │                        │
//!          └──────────────┬───────┴────────────────────────┘
//!                         │ gc() every interval
//!           ┌─────────────┴─────────────┐
//!           │      ExpirySweeper        │
//!           │  (Background Tokio Task)  │
//!           └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Uniform contract**: every backend implements [`Store`]
//! - **TTL Support**: values can carry a time-to-live
//! - **Lazy Expiry**: expired items read as absent
//! - **Active Expiry**: a per-store sweeper reclaims expired items
//!
//! ## Example
//!
//! ```
//! use ttlkv::config::MapConfig;
//! use ttlkv::storage::{MapStore, Store};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ttlkv::Result<()> {
//! let store = MapStore::open(MapConfig::default())?;
//!
//! store.set("name", "Ariz")?;
//! assert_eq!(store.get::<String>("name")?, Some("Ariz".to_string()));
//!
//! store.set_ex("session", &42u64, Duration::from_secs(3600))?;
//! assert!(store.has("session"));
//!
//! store.delete("session")?;
//! assert!(!store.has("session"));
//! # Ok(())
//! # }
//! ```

pub mod concurrent;
pub mod expiry;
pub mod file;
pub mod item;
pub mod map;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

// Re-export commonly used types
pub use concurrent::ConcurrentMapStore;
pub use expiry::ExpirySweeper;
pub use file::FileStore;
pub use item::Item;
pub use map::MapStore;

/// The contract shared by every store backend.
///
/// Request operations run synchronously on the caller's thread and may block
/// on the backend's locks. Only the expiry sweeper runs in the background.
pub trait Store: Send + Sync + 'static {
    /// Short backend name used in log fields.
    const KIND: &'static str;

    /// Stores `value` under `key` without expiry.
    ///
    /// The key must not be empty and the value must not be nil.
    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set_ex(key, value, Duration::ZERO)
    }

    /// Stores `value` under `key`, replacing any previous item. The item
    /// expires after `ttl`; a zero `ttl` never expires.
    fn set_ex<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Retrieves and decodes the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Reports whether a live item exists under `key`.
    ///
    /// Never fails: an invalid key or a storage error reads as `false`.
    fn has(&self, key: &str) -> bool;

    /// Deletes the item under `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Stops the expiry sweeper and releases in-process resources.
    ///
    /// Later operations fail with [`StoreError::Closed`](crate::StoreError::Closed).
    fn close(&self) -> Result<()>;

    /// Removes every item that has expired, returning how many were removed.
    fn gc(&self) -> Result<usize>;
}
