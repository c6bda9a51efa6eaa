use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use super::object_backend::{Backend, BackendError, KeyBatches, Result};

/// Number of keys per listing batch, mimicking object-store pagination.
const LIST_BATCH_SIZE: usize = 1000;

/// An in-memory implementation of `Backend`, intended primarily for testing
/// and for `memory://` references.
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, Bytes>>,
    batch_size: usize,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::with_batch_size(LIST_BATCH_SIZE)
    }

    /// Create a backend whose listings are split into batches of `batch_size`.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            batch_size: batch_size.max(1),
        }
    }

    /// All stored keys, in lexical order.
    pub fn keys(&self) -> Vec<String> {
        match self.objects.read() {
            Ok(objects) => objects.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Bytes>>> {
        self.objects
            .read()
            .map_err(|_| BackendError::Other("memory backend lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Bytes>>> {
        self.objects
            .write()
            .map_err(|_| BackendError::Other("memory backend lock poisoned".to_string()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn describe(&self) -> String {
        "memory://".to_string()
    }

    async fn list(&self, prefix: Option<&str>) -> Result<KeyBatches> {
        let dir_prefix = prefix.map(|p| format!("{}/", p.trim_end_matches('/')));
        let keys: Vec<String> = {
            let objects = self.read()?;
            objects
                .keys()
                .filter(|key| match &dir_prefix {
                    Some(p) => key.starts_with(p.as_str()),
                    None => true,
                })
                .cloned()
                .collect()
        };

        let batches: Vec<Result<Vec<String>>> = keys
            .chunks(self.batch_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        Ok(Box::pin(stream::iter(batches)))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let objects = self.read()?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let mut objects = self.write()?;
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn is_file(&self, key: &str) -> Result<bool> {
        let objects = self.read()?;
        Ok(objects.contains_key(key))
    }
}
