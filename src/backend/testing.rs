//! Test backend that records calls and injects failures.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::{Backend, BackendError, KeyBatches, MemoryBackend, Result};

/// A `MemoryBackend` wrapper that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingBackend {
    inner: MemoryBackend,
    put_calls: AtomicUsize,
    put_keys: Mutex<Vec<String>>,
    get_keys: Mutex<Vec<String>>,
    make_dirs_keys: Mutex<Vec<String>>,
    fail_put_on_call: Option<usize>,
    denied_gets: HashSet<String>,
    list_missing: bool,
    list_denied: bool,
    trailing_list_error: Option<fn(String) -> BackendError>,
    fail_make_dirs: bool,
    extra_listed: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th put call (1-based) with a permission error.
    pub fn fail_put_on_call(mut self, n: usize) -> Self {
        self.fail_put_on_call = Some(n);
        self
    }

    /// Fail reads of `key` with a permission error.
    pub fn deny_get(mut self, key: &str) -> Self {
        self.denied_gets.insert(key.to_string());
        self
    }

    /// Report every listing as not found.
    pub fn list_not_found(mut self) -> Self {
        self.list_missing = true;
        self
    }

    /// Fail every listing with a permission error.
    pub fn deny_list(mut self) -> Self {
        self.list_denied = true;
        self
    }

    /// End every listing stream with an error built from the prefix.
    pub fn end_listing_with(mut self, error: fn(String) -> BackendError) -> Self {
        self.trailing_list_error = Some(error);
        self
    }

    /// Fail `make_dirs` with an I/O error instead of reporting it unsupported.
    pub fn fail_make_dirs(mut self) -> Self {
        self.fail_make_dirs = true;
        self
    }

    /// Append a key to every listing regardless of prefix.
    pub fn with_extra_listed_key(mut self, key: &str) -> Self {
        self.extra_listed.push(key.to_string());
        self
    }

    /// Seed an object without recording a put.
    pub async fn seed(&self, key: &str, data: &[u8]) {
        self.inner
            .put(key, Bytes::copy_from_slice(data))
            .await
            .unwrap();
    }

    pub fn put_count(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.put_keys.lock().unwrap().clone()
    }

    pub fn get_keys(&self) -> Vec<String> {
        self.get_keys.lock().unwrap().clone()
    }

    pub fn make_dirs_keys(&self) -> Vec<String> {
        self.make_dirs_keys.lock().unwrap().clone()
    }

    /// Keys currently stored.
    pub fn stored_keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn describe(&self) -> String {
        "recording://".to_string()
    }

    async fn list(&self, prefix: Option<&str>) -> Result<KeyBatches> {
        if self.list_missing {
            return Err(BackendError::NotFound(prefix.unwrap_or("").to_string()));
        }
        if self.list_denied {
            return Err(BackendError::PermissionDenied(prefix.unwrap_or("").to_string()));
        }
        if let Some(error) = self.trailing_list_error {
            let tail = error(prefix.unwrap_or("").to_string());
            let batches = self.inner.list(prefix).await?;
            return Ok(Box::pin(batches.chain(futures::stream::iter([Err(tail)]))));
        }
        if self.extra_listed.is_empty() {
            return self.inner.list(prefix).await;
        }

        let mut keys: Vec<String> = self
            .inner
            .keys()
            .into_iter()
            .filter(|key| match prefix {
                Some(p) => key.starts_with(&format!("{}/", p)),
                None => true,
            })
            .collect();
        keys.extend(self.extra_listed.iter().cloned());
        Ok(Box::pin(futures::stream::iter(vec![Ok(keys)])))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.get_keys.lock().unwrap().push(key.to_string());
        if self.denied_gets.contains(key) {
            return Err(BackendError::PermissionDenied(key.to_string()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let call = self.put_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.put_keys.lock().unwrap().push(key.to_string());
        if self.fail_put_on_call == Some(call) {
            return Err(BackendError::PermissionDenied(key.to_string()));
        }
        self.inner.put(key, data).await
    }

    async fn is_file(&self, key: &str) -> Result<bool> {
        if self.extra_listed.iter().any(|k| k == key) {
            return Ok(true);
        }
        self.inner.is_file(key).await
    }

    async fn make_dirs(&self, key: &str) -> Result<()> {
        self.make_dirs_keys.lock().unwrap().push(key.to_string());
        if self.fail_make_dirs {
            return Err(BackendError::Io(std::io::Error::other(format!(
                "mkdir {} failed",
                key
            ))));
        }
        Err(BackendError::Unsupported(format!("make_dirs({})", key)))
    }
}
