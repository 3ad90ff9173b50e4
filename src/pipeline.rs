//! Load pipeline: cache, fetch, normalize
//!
//! A [`Loader`] produces immutable [`Dataset`] snapshots. Each load cycle
//! (check the cache, otherwise fetch and write the cache) runs under one lock,
//! and a cycle requested while another is running is rejected instead of
//! overlapping it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::data::{normalize, DataUnavailable, FetchStage, SourceFetcher, WaterSourceRecord};
use crate::filter;

/// Errors that end a load cycle
#[derive(Debug, Error)]
pub enum LoadError {
    /// Another load is still running
    #[error("A load is already in progress")]
    Busy,

    /// Neither the primary nor the fallback source could be read
    #[error(transparent)]
    Unavailable(#[from] DataUnavailable),
}

/// Where a dataset's records came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Cache,
    Primary,
    Fallback,
}

impl From<FetchStage> for DataOrigin {
    fn from(stage: FetchStage) -> Self {
        match stage {
            FetchStage::Primary => DataOrigin::Primary,
            FetchStage::Fallback => DataOrigin::Fallback,
        }
    }
}

/// Immutable snapshot of the full record set and its facet vocabularies
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Every normalized record, mappable or not
    pub records: Arc<[WaterSourceRecord]>,
    /// Sorted distinct districts
    pub districts: Vec<String>,
    /// Sorted distinct types
    pub types: Vec<String>,
    /// Where the records came from
    pub origin: DataOrigin,
    /// When the snapshot was built
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Builds a snapshot and derives its vocabularies
    pub fn new(records: Vec<WaterSourceRecord>, origin: DataOrigin) -> Self {
        let districts = filter::districts(&records);
        let types = filter::types(&records);
        Self {
            records: records.into(),
            districts,
            types,
            origin,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs load cycles against a cache and a fetcher
#[derive(Debug)]
pub struct Loader {
    cache: Option<CacheStore>,
    fetcher: SourceFetcher,
    lock: Mutex<()>,
}

impl Loader {
    /// Creates a loader; without a cache every load fetches
    pub fn new(cache: Option<CacheStore>, fetcher: SourceFetcher) -> Self {
        Self {
            cache,
            fetcher,
            lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    pub fn fetcher(&self) -> &SourceFetcher {
        &self.fetcher
    }

    /// Whether a load cycle is currently running
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Starts a load cycle, or fails with [`LoadError::Busy`] if one is running
    pub fn begin(&self) -> Result<LoadCycle<'_>, LoadError> {
        let guard = self.lock.try_lock().map_err(|_| LoadError::Busy)?;
        Ok(LoadCycle {
            loader: self,
            _guard: guard,
        })
    }

    /// Serves a valid cache entry, otherwise fetches
    pub async fn load(&self) -> Result<Dataset, LoadError> {
        let cycle = self.begin()?;
        if let Some(dataset) = cycle.cached() {
            return Ok(dataset);
        }
        cycle.fetch().await
    }

    /// Fetches without consulting the cache, then rewrites it
    pub async fn refresh(&self) -> Result<Dataset, LoadError> {
        info!("Refreshing water source data");
        self.begin()?.fetch().await
    }
}

/// One exclusive load cycle; the cache check and the cache write both happen
/// while it is held
pub struct LoadCycle<'a> {
    loader: &'a Loader,
    _guard: MutexGuard<'a, ()>,
}

impl LoadCycle<'_> {
    /// Returns a dataset from the cache if the entry is present and valid
    pub fn cached(&self) -> Option<Dataset> {
        let cache = self.loader.cache.as_ref()?;
        let entry = cache.read();
        if !cache.is_valid(entry.as_ref()) {
            debug!(present = entry.is_some(), "Cache miss");
            return None;
        }
        let entry = entry?;
        let records = normalize(&entry.data);
        info!(count = records.len(), "Loaded water sources from cache");
        Some(Dataset::new(records, DataOrigin::Cache))
    }

    /// Fetches, writes the raw payload to the cache, then normalizes it
    pub async fn fetch(self) -> Result<Dataset, LoadError> {
        let payload = self.loader.fetcher.fetch().await?;

        if let Some(ref cache) = self.loader.cache {
            if let Err(e) = cache.write(&payload.raw) {
                warn!(error = %e, "Failed to write cache entry");
            }
        }

        let records = normalize(&payload.raw);
        info!(count = records.len(), stage = ?payload.stage, "Fetched water sources");
        Ok(Dataset::new(records, payload.stage.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::data::DataSource;
    use chrono::Duration;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const GRAPH: &str = r#"{"@graph": [
        {"id": "1", "title": "Fuente A", "address": {"district-id": "Centro"},
         "condition": "Operational", "location": {"latitude": 40.41, "longitude": -3.70}}
    ]}"#;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().expect("Failed to create temp directory"),
            }
        }

        fn file(&self, name: &str, body: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, body).unwrap();
            path
        }

        fn missing(&self) -> DataSource {
            DataSource::File(self.dir.path().join("missing.json"))
        }

        fn cache(&self) -> CacheStore {
            CacheStore::with_dir(self.dir.path().join("cache"), "test", Duration::days(1))
        }
    }

    #[tokio::test]
    async fn test_miss_fetches_and_writes_cache() {
        let fx = Fixture::new();
        let primary = fx.file("primary.json", GRAPH);
        let loader = Loader::new(
            Some(fx.cache()),
            SourceFetcher::new(DataSource::File(primary), fx.missing()),
        );

        let dataset = loader.load().await.unwrap();

        assert_eq!(dataset.origin, DataOrigin::Primary);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.districts, vec!["Centro"]);
        let cached = fx.cache().read().expect("cache should be written");
        assert_eq!(cached.data["@graph"][0]["title"], "Fuente A");
    }

    #[tokio::test]
    async fn test_valid_cache_skips_fetch() {
        let fx = Fixture::new();
        fx.cache().write(&json!([{"name": "cached"}])).unwrap();
        let loader = Loader::new(
            Some(fx.cache()),
            SourceFetcher::new(fx.missing(), fx.missing()),
        );

        let dataset = loader.load().await.expect("cache hit needs no source");

        assert_eq!(dataset.origin, DataOrigin::Cache);
        assert_eq!(dataset.records[0].name, "cached");
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_fetch() {
        let fx = Fixture::new();
        let stale = CacheEntry::new(json!([{"name": "old"}]), Utc::now() - Duration::days(2));
        fx.cache().write_entry(&stale).unwrap();
        let primary = fx.file("primary.json", r#"[{"name": "new"}]"#);
        let loader = Loader::new(
            Some(fx.cache()),
            SourceFetcher::new(DataSource::File(primary), fx.missing()),
        );

        let dataset = loader.load().await.unwrap();

        assert_eq!(dataset.origin, DataOrigin::Primary);
        assert_eq!(dataset.records[0].name, "new");
        assert_eq!(fx.cache().read().unwrap().data, json!([{"name": "new"}]));
    }

    #[tokio::test]
    async fn test_corrupt_cache_triggers_fetch() {
        let fx = Fixture::new();
        let cache = fx.cache();
        fs::create_dir_all(cache.cache_dir()).unwrap();
        fs::write(cache.path(), "garbage").unwrap();
        let loader = Loader::new(
            Some(cache),
            SourceFetcher::new(fx.missing(), DataSource::Bundled),
        );

        let dataset = loader.load().await.unwrap();

        assert_eq!(dataset.origin, DataOrigin::Fallback);
        assert!(!dataset.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_payload_is_cached_raw() {
        let fx = Fixture::new();
        let fallback = fx.file("fallback.json", GRAPH);
        let loader = Loader::new(
            Some(fx.cache()),
            SourceFetcher::new(fx.missing(), DataSource::File(fallback)),
        );

        let dataset = loader.load().await.unwrap();

        assert_eq!(dataset.origin, DataOrigin::Fallback);
        assert_eq!(dataset.records[0].name, "Fuente A");
        let expected: serde_json::Value = serde_json::from_str(GRAPH).unwrap();
        assert_eq!(fx.cache().read().unwrap().data, expected);
    }

    #[tokio::test]
    async fn test_both_sources_failing_leaves_cache_untouched() {
        let fx = Fixture::new();
        let loader = Loader::new(
            Some(fx.cache()),
            SourceFetcher::new(fx.missing(), fx.missing()),
        );

        let err = loader.load().await.expect_err("no source is readable");

        assert!(matches!(err, LoadError::Unavailable(_)));
        assert!(fx.cache().read().is_none());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_valid_cache() {
        let fx = Fixture::new();
        fx.cache().write(&json!([{"name": "cached"}])).unwrap();
        let primary = fx.file("primary.json", r#"[{"name": "fresh"}]"#);
        let loader = Loader::new(
            Some(fx.cache()),
            SourceFetcher::new(DataSource::File(primary), fx.missing()),
        );

        let dataset = loader.refresh().await.unwrap();

        assert_eq!(dataset.origin, DataOrigin::Primary);
        assert_eq!(dataset.records[0].name, "fresh");
    }

    #[tokio::test]
    async fn test_load_while_busy_is_rejected() {
        let fx = Fixture::new();
        let loader = Loader::new(None, SourceFetcher::new(DataSource::Bundled, fx.missing()));

        let held = loader.begin().unwrap();
        assert!(loader.is_busy());
        assert!(matches!(loader.load().await, Err(LoadError::Busy)));
        assert!(matches!(loader.refresh().await, Err(LoadError::Busy)));
        drop(held);

        assert!(!loader.is_busy());
        assert!(loader.load().await.is_ok());
    }

    #[tokio::test]
    async fn test_without_cache_always_fetches() {
        let fx = Fixture::new();
        let loader = Loader::new(None, SourceFetcher::new(DataSource::Bundled, fx.missing()));

        assert!(loader.begin().unwrap().cached().is_none());
        assert_eq!(loader.load().await.unwrap().origin, DataOrigin::Primary);
    }
}
