//! File Store
//!
//! Persists every item as one file in a directory. The file name is the
//! escaped key plus an optional extension (see [`naming`]); the content is
//! the codec-encoded item record, deadline included.
//!
//! ## Locking
//!
//! ```text
//!   lock_for("user%2F1") ──> LockRegistry ──> KeyLock (RwLock per key)
//!
//!   set_ex / delete      write lock while the file is written/removed
//!   get / has            read lock while the file is read, decode after
//!   gc                   write lock of the key each visited file maps to
//! ```
//!
//! Operations on different keys never wait on each other. Operations on the
//! same key are serialized, including the sweep's visit to that key's file.
//!
//! Writes overwrite the whole file in place: a crash mid-write can leave a
//! truncated record behind, which later reads report as a decode error.

mod locks;
pub mod naming;

use crate::codec::{Codec, JsonCodec};
use crate::config::FileConfig;
use crate::error::{Result, StoreError};
use crate::storage::expiry::{self, ExpirySweeper};
use crate::storage::{Item, Store};
use crate::validate::{check_key, check_value};
use chrono::Utc;
use locks::LockRegistry;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// A store keeping one file per key in a directory.
///
/// # Example
///
/// ```no_run
/// use ttlkv::config::FileConfig;
/// use ttlkv::storage::{FileStore, Store};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ttlkv::Result<()> {
/// let store = FileStore::open(FileConfig::new("/var/lib/myapp/kv"))?;
/// store.set_ex("session/42", "token", Duration::from_secs(3600))?;
/// // -> /var/lib/myapp/kv/session%2F42.json
/// # Ok(())
/// # }
/// ```
pub struct FileStore<C: Codec = JsonCodec> {
    directory: PathBuf,
    extension: Option<String>,
    codec: C,
    locks: LockRegistry,
    closed: AtomicBool,
    sweeper: ExpirySweeper,
}

impl<C: Codec> std::fmt::Debug for FileStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("directory", &self.directory)
            .field("extension", &self.extension)
            .field("locks", &self.locks.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C: Codec> FileStore<C> {
    /// Creates the directory if needed, then starts the store's expiry
    /// sweeper.
    ///
    /// Must be called within a Tokio runtime.
    pub fn open(config: FileConfig<C>) -> Result<Arc<Self>> {
        let directory = config.directory().to_path_buf();
        let extension = config.extension().map(str::to_owned);
        let interval = config.sweep_interval();

        create_dir(&directory)?;

        let store = expiry::start_with_sweeper(interval, |sweeper| Self {
            directory,
            extension,
            codec: config.codec,
            locks: LockRegistry::new(),
            closed: AtomicBool::new(false),
            sweeper,
        })?;

        info!(directory = %store.directory.display(), "File store opened");
        Ok(store)
    }

    /// The directory holding the store's files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.path_for_escaped(&naming::escape_key(key))
    }

    fn path_for_escaped(&self, escaped_key: &str) -> PathBuf {
        self.directory
            .join(naming::file_name(escaped_key, self.extension.as_deref()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Reads the raw record of `key` under its read lock.
    ///
    /// `Ok(None)` when the file does not exist.
    fn read_record(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let escaped = naming::escape_key(key);
        let path = self.path_for_escaped(&escaped);

        let lock = self.locks.lock_for(&escaped);
        let read = {
            let _guard = lock.read();
            fs::read(&path)
        };

        match read {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Visits one directory entry during a sweep. Returns true if the file
    /// was removed.
    fn sweep_entry(&self, path: &Path) -> Result<bool> {
        let Some(key) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| naming::key_from_file_name(name, self.extension.as_deref()))
        else {
            trace!(path = %path.display(), "gc: skipping foreign file");
            return Ok(false);
        };

        let lock = self.locks.lock_for(&naming::escape_key(&key));
        let _guard = lock.write();

        trace!(path = %path.display(), key = %key, "gc: check");

        let data = match fs::read(path) {
            Ok(data) => data,
            // Deleted between listing and locking
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let item: Item<IgnoredAny> = self.codec.unmarshal(&data).map_err(StoreError::Decode)?;
        if !item.is_expired_at(Utc::now()) {
            return Ok(false);
        }

        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl<C: Codec> Store for FileStore<C> {
    const KIND: &'static str = "file";

    fn set_ex<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        check_key(key)?;
        check_value(value)?;
        self.ensure_open()?;

        let item = Item::new(value, ttl)?;
        let data = self.codec.marshal(&item).map_err(StoreError::Encode)?;

        let escaped = naming::escape_key(key);
        let path = self.path_for_escaped(&escaped);

        let lock = self.locks.lock_for(&escaped);
        let _guard = lock.write();
        self.ensure_open()?;
        write_file(&path, &data)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        check_key(key)?;
        self.ensure_open()?;

        let Some(data) = self.read_record(key)? else {
            return Ok(None);
        };

        // Decoding happens outside the lock
        let item: Item<T> = self.codec.unmarshal(&data).map_err(StoreError::Decode)?;
        if item.is_expired() {
            return Ok(None);
        }

        Ok(Some(item.data))
    }

    fn has(&self, key: &str) -> bool {
        if check_key(key).is_err() || self.ensure_open().is_err() {
            return false;
        }

        match self.read_record(key) {
            Ok(Some(data)) => self
                .codec
                .unmarshal::<Item<IgnoredAny>>(&data)
                .is_ok_and(|item| !item.is_expired()),
            Ok(None) | Err(_) => false,
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.ensure_open()?;

        let escaped = naming::escape_key(key);
        let path = self.path_for_escaped(&escaped);

        let lock = self.locks.lock_for(&escaped);
        let _guard = lock.write();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.sweeper.stop();

        info!(directory = %self.directory.display(), "File store closed");
        Ok(())
    }

    /// Removes expired files.
    ///
    /// Only the top level of the directory is visited; subdirectories and
    /// files whose names this store could not have produced are skipped. The
    /// first read or decode failure aborts the sweep and is returned, leaving
    /// later files for the next run.
    fn gc(&self) -> Result<usize> {
        self.ensure_open()?;

        debug!(directory = %self.directory.display(), "gc begin");

        let mut reclaimed = 0;
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if self.sweep_entry(&entry.path())? {
                reclaimed += 1;
            }
        }

        debug!(reclaimed = reclaimed, "gc end");
        Ok(reclaimed)
    }
}

#[cfg(unix)]
fn create_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Overwrites `path` with `data`, creating it with owner-only permissions.
fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)
}
