//! In-memory key-value cache backed by a JSON snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::snapshot::{read_snapshot, write_snapshot};
use super::CacheResult;

/// A process-lifetime string map with a load/save lifecycle.
///
/// The map lives behind a mutex; every `*_and_save` method mutates and
/// rewrites the snapshot while holding the lock, so writers in the same
/// process never interleave a read-modify-write.
#[derive(Debug)]
pub struct KvCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl KvCache {
    /// Load the cache from `path`. Never fails; see [`read_snapshot`].
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let entries = read_snapshot(path);
        log::debug!(
            "Loaded {} cache entries from {}",
            entries.len(),
            path.display()
        );
        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        }
    }

    /// Backing snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Whether any entry maps to `value`. Linear in the cache size.
    pub fn contains_value(&self, value: &str) -> bool {
        self.lock().values().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current map.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    /// Insert without persisting. Pair with [`KvCache::save`] for batches.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(key.into(), value.into());
    }

    /// Remove without persisting.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    /// Persist the whole map.
    pub fn save(&self) -> CacheResult<()> {
        let entries = self.lock();
        write_snapshot(&self.path, &entries)
    }

    /// Insert and persist under one lock.
    pub fn put_and_save(&self, key: impl Into<String>, value: impl Into<String>) -> CacheResult<()> {
        let mut entries = self.lock();
        entries.insert(key.into(), value.into());
        write_snapshot(&self.path, &entries)
    }

    /// Remove and persist under one lock. Nothing is written if the key
    /// was absent.
    pub fn remove_and_save(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.lock();
        let removed = entries.remove(key);
        if removed.is_some() {
            write_snapshot(&self.path, &entries)?;
        }
        Ok(removed)
    }

    /// Run `f` against the map and persist afterwards if it reports a change.
    ///
    /// The closure returns `(changed, output)`.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> (bool, R),
    ) -> CacheResult<R> {
        let mut entries = self.lock();
        let (changed, output) = f(&mut entries);
        if changed {
            write_snapshot(&self.path, &entries)?;
        }
        Ok(output)
    }
}
