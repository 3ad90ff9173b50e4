//! Single-entry cache for the raw water source payload
//!
//! Stores the payload exactly as received, together with the epoch-millisecond
//! time it was written, as one JSON file. An entry is valid while
//! `now < timestamp + expiry`.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cache key used when none is configured
pub const DEFAULT_CACHE_KEY: &str = "water_sources";

/// Default expiry window of one day
pub const DEFAULT_EXPIRY_DAYS: u32 = 1;

/// Raw payload plus the time it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Payload as received from the source, before normalization
    pub data: Value,
    /// Epoch milliseconds at which `data` was written
    pub timestamp: i64,
}

impl CacheEntry {
    /// Creates an entry stamped with the given time
    pub fn new(data: Value, written_at: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: written_at.timestamp_millis(),
        }
    }

    /// Returns the write time, if the stored timestamp is representable
    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Persists one named cache entry to disk
///
/// The file lives in an XDG-compliant cache directory
/// (`~/.cache/fountainmap/` on Linux) unless a directory is given explicitly.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where the cache file is stored
    cache_dir: PathBuf,
    /// Name of the single cache slot
    key: String,
    /// How long an entry stays valid after it is written
    expiry: Duration,
}

impl CacheStore {
    /// Creates a store in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new(key: &str, expiry: Duration) -> Option<Self> {
        Some(Self::with_dir(default_cache_dir()?, key, expiry))
    }

    /// Creates a store in a specific directory
    pub fn with_dir(cache_dir: PathBuf, key: &str, expiry: Duration) -> Self {
        Self {
            cache_dir,
            key: key.to_string(),
            expiry,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Path of the file backing the cache slot
    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", self.key))
    }

    /// Reads the stored entry
    ///
    /// Returns `None` when nothing is stored or the stored value cannot be
    /// parsed. A corrupt entry is logged and treated as a miss.
    pub fn read(&self) -> Option<CacheEntry> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache entry");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache entry is corrupt, ignoring it");
                None
            }
        }
    }

    /// Stores `data` with the current time, replacing any prior entry
    pub fn write(&self, data: &Value) -> io::Result<()> {
        self.write_entry(&CacheEntry::new(data.clone(), Utc::now()))
    }

    /// Stores a complete entry, replacing any prior entry
    pub fn write_entry(&self, entry: &CacheEntry) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        fs::write(self.path(), json)?;
        debug!(key = %self.key, "Cache entry written");
        Ok(())
    }

    /// Removes the stored entry, if any
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(self.path()) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Whether an entry is still within its expiry window right now
    pub fn is_valid(&self, entry: Option<&CacheEntry>) -> bool {
        self.is_valid_at(entry, Utc::now())
    }

    /// Whether an entry is within its expiry window at `now`
    ///
    /// The boundary instant itself is already expired.
    pub fn is_valid_at(&self, entry: Option<&CacheEntry>, now: DateTime<Utc>) -> bool {
        let Some(entry) = entry else {
            return false;
        };
        let expires_at = entry
            .timestamp
            .saturating_add(self.expiry.num_milliseconds());
        now.timestamp_millis() < expires_at
    }
}

/// Platform cache directory for this application
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fountainmap").map(|dirs| dirs.cache_dir().to_path_buf())
}
