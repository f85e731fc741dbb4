//! Store configuration.
//!
//! Each backend takes an explicit configuration value. Unset fields fall back
//! to the defaults below through plain functions; there is no global,
//! mutable "default options" object.
//!
//! # Example
//!
//! ```
//! use ttlkv::config::FileConfig;
//! use std::time::Duration;
//!
//! let config = FileConfig::new("/tmp/sessions")
//!     .with_extension("")
//!     .with_sweep_interval(Duration::from_secs(5));
//!
//! assert_eq!(config.extension(), None);
//! assert_eq!(config.sweep_interval(), Duration::from_secs(5));
//! ```

use crate::codec::{Codec, JsonCodec};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Interval between two expiry sweeps when none is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Directory used by the file store when none is configured.
pub const DEFAULT_DIRECTORY: &str = "kvs";

/// File name extension used by the file store when none is configured.
pub const DEFAULT_EXTENSION: &str = "json";

/// Resolves a configured sweep interval, treating zero as "use the default".
pub fn resolve_sweep_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_SWEEP_INTERVAL
    } else {
        interval
    }
}

/// Resolves a configured extension, treating an empty string as "none".
pub fn resolve_extension(extension: Option<&str>) -> Option<&str> {
    extension.filter(|ext| !ext.is_empty())
}

/// Configuration for the in-memory backends
/// ([`MapStore`](crate::storage::MapStore) and
/// [`ConcurrentMapStore`](crate::storage::ConcurrentMapStore)).
#[derive(Debug, Clone)]
pub struct MapConfig<C = JsonCodec> {
    /// Value encoding (default: JSON)
    pub codec: C,

    /// Interval between expiry sweeps (default: 30s, zero means default)
    pub sweep_interval: Duration,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            codec: JsonCodec,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl MapConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Codec> MapConfig<C> {
    /// Replaces the codec.
    pub fn with_codec<D: Codec>(self, codec: D) -> MapConfig<D> {
        MapConfig {
            codec,
            sweep_interval: self.sweep_interval,
        }
    }

    /// Sets the interval between expiry sweeps.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// The effective sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        resolve_sweep_interval(self.sweep_interval)
    }
}

/// Configuration for [`FileStore`](crate::storage::FileStore).
#[derive(Debug, Clone)]
pub struct FileConfig<C = JsonCodec> {
    /// Directory holding one file per key, absolute or relative (default: "kvs")
    pub directory: PathBuf,

    /// File name extension without the dot (default: "json").
    ///
    /// Purely cosmetic. `None` or an empty string disables it. Keep it in
    /// line with the codec, or existing files will look stale.
    pub extension: Option<String>,

    /// Encoding of the whole on-disk record (default: JSON)
    pub codec: C,

    /// Interval between expiry sweeps (default: 30s, zero means default)
    pub sweep_interval: Duration,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            extension: Some(DEFAULT_EXTENSION.to_string()),
            codec: JsonCodec,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl FileConfig {
    /// Creates a configuration rooted at `directory`, other fields default.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }
}

impl<C: Codec> FileConfig<C> {
    /// Replaces the codec.
    pub fn with_codec<D: Codec>(self, codec: D) -> FileConfig<D> {
        FileConfig {
            directory: self.directory,
            extension: self.extension,
            codec,
            sweep_interval: self.sweep_interval,
        }
    }

    /// Sets the file name extension. An empty string disables it.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Sets the interval between expiry sweeps.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// The effective directory, falling back to [`DEFAULT_DIRECTORY`] when empty.
    pub fn directory(&self) -> &Path {
        if self.directory.as_os_str().is_empty() {
            Path::new(DEFAULT_DIRECTORY)
        } else {
            &self.directory
        }
    }

    /// The effective extension.
    pub fn extension(&self) -> Option<&str> {
        resolve_extension(self.extension.as_deref())
    }

    /// The effective sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        resolve_sweep_interval(self.sweep_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_config() {
        let config = MapConfig::default();
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.codec, JsonCodec);
    }

    #[test]
    fn test_zero_interval_resolves_to_default() {
        let config = MapConfig::new().with_sweep_interval(Duration::ZERO);
        assert_eq!(config.sweep_interval(), DEFAULT_SWEEP_INTERVAL);

        let config = FileConfig::default().with_sweep_interval(Duration::ZERO);
        assert_eq!(config.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_default_file_config() {
        let config = FileConfig::default();
        assert_eq!(config.directory(), Path::new("kvs"));
        assert_eq!(config.extension(), Some("json"));
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_directory_falls_back() {
        let config = FileConfig::new("");
        assert_eq!(config.directory(), Path::new("kvs"));
    }

    #[test]
    fn test_extension_overrides() {
        assert_eq!(FileConfig::default().with_extension("").extension(), None);
        assert_eq!(
            FileConfig::default().with_extension("txt").extension(),
            Some("txt")
        );

        let mut config = FileConfig::default();
        config.extension = None;
        assert_eq!(config.extension(), None);
    }

    #[test]
    fn test_builder_chaining_keeps_fields() {
        let config = FileConfig::new("data")
            .with_extension("kv")
            .with_sweep_interval(Duration::from_millis(250))
            .with_codec(JsonCodec);
        assert_eq!(config.directory(), Path::new("data"));
        assert_eq!(config.extension(), Some("kv"));
        assert_eq!(config.sweep_interval(), Duration::from_millis(250));
    }
}
