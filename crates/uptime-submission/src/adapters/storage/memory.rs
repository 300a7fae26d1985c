use crate::domain::StorageError;
use crate::ports::ObjectStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
    writes: HashMap<String, usize>,
}

/// In-memory object store.
///
/// Used by tests and for dry runs. Keeps a per-path write counter so callers
/// can observe how often an object was actually written.
pub struct MemoryStore {
    name: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().objects.get(path).cloned()
    }

    /// Number of writes performed for `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.inner.lock().writes.get(path).copied().unwrap_or(0)
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.inner.lock().objects.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.inner.lock().objects.contains_key(path))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.objects.insert(path.to_string(), bytes.to_vec());
        *inner.writes.entry(path.to_string()).or_default() += 1;
        Ok(())
    }
}
