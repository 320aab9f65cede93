//! Bounded path-to-identifier cache.

use dashmap::DashMap;

use crate::Path;

/// Default number of cached identifiers.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Concurrent map from document paths to backend identifiers.
///
/// Inserts and removals are atomic per key. When full, an arbitrary entry
/// is evicted before inserting.
#[derive(Debug)]
pub struct DocumentIdCache {
    ids: DashMap<Path, String>,
    capacity: usize,
}

impl DocumentIdCache {
    /// An empty cache holding at most `capacity` identifiers.
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// The cached identifier for `path`.
    pub fn get(&self, path: &Path) -> Option<String> {
        self.ids.get(path).map(|id| id.value().clone())
    }

    /// Cache `id` for `path`.
    pub fn insert(&self, path: Path, id: String) {
        if self.ids.len() >= self.capacity && !self.ids.contains_key(&path) {
            let victim = self.ids.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.ids.remove(&victim);
            }
        }
        self.ids.insert(path, id);
    }

    /// Forget `path`.
    pub fn remove(&self, path: &Path) {
        self.ids.remove(path);
    }

    /// Forget `path` and every path below it.
    pub fn remove_tree(&self, path: &Path) {
        self.ids.retain(|cached, _| !cached.starts_with(path));
    }

    /// Number of cached identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.ids.clear();
    }
}

impl Default for DocumentIdCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
