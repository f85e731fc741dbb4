//! # ttlkv - Expiry-Aware Key-Value Stores
//!
//! ttlkv offers one key-value contract, [`Store`], with an optional
//! time-to-live per entry, implemented by three interchangeable backends.
//!
//! ## Features
//!
//! - **Three Backends**: a locked `HashMap`, a concurrent `DashMap`, and a
//!   directory with one file per key
//! - **TTL Support**: entries can expire; expired entries read as absent
//! - **Background Sweeper**: every store reclaims expired entries on a timer
//! - **Pluggable Codec**: values go through a [`Codec`] (JSON by default)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                ttlkv                                    │
//! │                                                                         │
//! │   caller ──> validate ──> Codec::marshal ──> Item { expires_at, data }  │
//! │                                                   │                     │
//! │               ┌───────────────────────────────────┼──────────────┐      │
//! │               ▼                                   ▼              ▼      │
//! │  ┌──────────────────────┐  ┌──────────────────────┐  ┌─────────────────┐│
//! │  │      MapStore        │  │  ConcurrentMapStore  │  │    FileStore    ││
//! │  │  RwLock<HashMap>     │  │  DashMap             │  │  file per key   ││
//! │  └──────────▲───────────┘  └──────────▲───────────┘  └────────▲────────┘│
//! │             │                         │                       │         │
//! │             └─────────── gc() ────────┴───────────────────────┘         │
//! │                               ▲                                         │
//! │                 ┌─────────────┴───────────────┐                         │
//! │                 │        ExpirySweeper        │                         │
//! │                 │   (Background Tokio Task)   │                         │
//! │                 └─────────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use ttlkv::config::FileConfig;
//! use ttlkv::storage::{FileStore, Store};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> ttlkv::Result<()> {
//!     let store = FileStore::open(FileConfig::new("kvs"))?;
//!
//!     store.set("a", &1)?;
//!     store.set_ex("b", &2, Duration::from_secs(1))?;
//!
//!     assert_eq!(store.get::<i32>("a")?, Some(1));
//!     assert!(store.has("b"));
//!
//!     tokio::time::sleep(Duration::from_secs(2)).await;
//!     assert_eq!(store.get::<i32>("b")?, None);
//!
//!     store.close()
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the [`Store`] trait, the backends, items and the sweeper
//! - [`codec`]: value encoding
//! - [`config`]: per-store configuration and defaults
//! - [`validate`]: key and value checks run before any storage access
//! - [`error`]: error types
//!
//! ## Design Highlights
//!
//! ### Locking
//!
//! `MapStore` serializes all writers (and the sweep) on one `RwLock`.
//! `ConcurrentMapStore` relies on `DashMap`'s internal shards. `FileStore`
//! keeps one `RwLock` per key, so different keys never wait on each other.
//! In every backend, payloads are decoded after the lock is released.
//!
//! ### Lazy + Active Expiry
//!
//! Expired entries are handled in two ways:
//! 1. **Lazy**: reads treat an expired entry as absent
//! 2. **Active**: each store's sweeper periodically deletes expired entries
//!
//! The sweeper stops when the store is closed or dropped.

pub mod codec;
pub mod config;
pub mod error;
pub mod storage;
pub mod validate;

// Re-export commonly used types for convenience
pub use codec::{Codec, JsonCodec};
pub use config::{FileConfig, MapConfig};
pub use error::{CodecError, Result, StoreError};
pub use storage::{ConcurrentMapStore, ExpirySweeper, FileStore, Item, MapStore, Store};

/// Version of ttlkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
