//! Read-mostly cache for spatial parse results.
//!
//! A confirmed re-parse reuses the cached word extraction instead of
//! re-reading the PDF. Bounded; the oldest entry is evicted first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::spatial::SpatialParseResult;

/// Maximum number of cached documents.
const CACHE_CAPACITY: usize = 16;

/// Parse result cache keyed by file path.
#[derive(Debug, Default)]
pub struct ParseCache {
    inner: RwLock<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<PathBuf, Arc<SpatialParseResult>>,
    order: Vec<PathBuf>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for a path, if any.
    pub fn get(&self, path: &Path) -> Option<Arc<SpatialParseResult>> {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.entries.get(path).cloned()
    }

    /// Insert a result, evicting the oldest entry when full.
    pub fn insert(&self, path: PathBuf, result: SpatialParseResult) -> Arc<SpatialParseResult> {
        let result = Arc::new(result);
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.entries.contains_key(&path) {
            guard.order.push(path.clone());
            if guard.order.len() > CACHE_CAPACITY {
                let oldest = guard.order.remove(0);
                guard.entries.remove(&oldest);
            }
        }
        guard.entries.insert(path, result.clone());
        result
    }

    /// Drop a cached entry (e.g. the file changed on disk).
    pub fn invalidate(&self, path: &Path) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.entries.remove(path);
        guard.order.retain(|p| p != path);
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
