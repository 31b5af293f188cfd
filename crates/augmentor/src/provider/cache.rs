//! In-process result cache and cache-key hashing.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::collaborator::ResultCache;
use crate::error::{AugmentError, Result};

/// SHA-256 over the JSON encoding of `parts`, rendered `sha256:<hex>`.
pub fn cache_key<T: Serialize + ?Sized>(parts: &T) -> Result<String> {
    let bytes = serde_json::to_vec(parts)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

/// Mutex-guarded in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for MemoryCache {
    fn cache_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AugmentError::Cache("cache lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn cache_put(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AugmentError::Cache("cache lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable() {
        let a = cache_key(&("table-hash", "result")).unwrap();
        let b = cache_key(&("table-hash", "result")).unwrap();
        let c = cache_key(&("table-hash", "other")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("sha256:"));
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.cache_get("k").unwrap(), None);
        assert!(cache.cache_put("k", b"v").unwrap());
        assert_eq!(cache.cache_get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.len(), 1);
    }
}
