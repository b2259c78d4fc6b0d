use crate::types::region_table::RegionTable;
use std::collections::{hash_map::Entry, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies one extraction: a source file and a region in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub file: PathBuf,
    pub geocode: u32,
}

impl CacheKey {
    pub fn new(file: impl Into<PathBuf>, geocode: u32) -> Self {
        Self {
            file: file.into(),
            geocode,
        }
    }
}

/// Memoizes daily tables per `(file, geocode)`.
///
/// Source files are treated as immutable, so entries never go stale on their own.
/// Callers that rewrite a file in place must [`evict_file`](Self::evict_file) it.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, Arc<RegionTable>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<RegionTable>>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<RegionTable>> {
        self.lock().get(key).cloned()
    }

    /// Stores `table` under `key` and returns the cached instance.
    ///
    /// If another caller stored a table for the same key first, that one is kept
    /// and returned instead, so every caller observes the same table.
    pub fn insert(&self, key: CacheKey, table: RegionTable) -> Arc<RegionTable> {
        match self.lock().entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(Arc::new(table)).clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drops every entry derived from `file`, returning how many were removed.
    pub fn evict_file(&self, file: &Path) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| key.file != file);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table(geocode: u32, value: f64) -> RegionTable {
        let frame = df!("temp_med" => [value]).unwrap();
        RegionTable::new(geocode, frame)
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = ResultCache::new();
        let key = CacheKey::new("/data/a.nc", 1);
        let first = cache.insert(key.clone(), table(1, 1.0));
        let second = cache.insert(key.clone(), table(1, 2.0));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &cache.get(&key).unwrap()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evict_file_and_clear() {
        let cache = ResultCache::new();
        cache.insert(CacheKey::new("/data/a.nc", 1), table(1, 1.0));
        cache.insert(CacheKey::new("/data/a.nc", 2), table(2, 1.0));
        cache.insert(CacheKey::new("/data/b.nc", 1), table(1, 1.0));

        assert_eq!(cache.evict_file(Path::new("/data/a.nc")), 2);
        assert!(cache.get(&CacheKey::new("/data/a.nc", 1)).is_none());
        assert!(cache.get(&CacheKey::new("/data/b.nc", 1)).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
