use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Nothing exists at the given key or prefix.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused access to the given key.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend does not support the requested operation.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// A key could not be mapped onto the backend's namespace.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A custom error message.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Classify an I/O error that occurred while accessing `key`.
    pub fn from_io(key: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(key.to_string()),
            _ => BackendError::Io(err),
        }
    }

    /// Whether this error means the key or prefix does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Async stream of key batches produced by a listing.
///
/// Backends yield keys in whatever batches their listing API returns. Every
/// key under the listed prefix appears exactly once across all batches.
pub type KeyBatches = Pin<Box<dyn futures::Stream<Item = Result<Vec<String>>> + Send>>;

/// A key-value storage capability: an object store or a filesystem.
///
/// Keys are POSIX-style paths relative to the backend's root, never with a
/// leading slash. A backend is shared read-only (`Arc<dyn Backend>`) by every
/// operation bound to it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A short description of the key space, for diagnostics.
    fn describe(&self) -> String;

    /// List every key under `prefix`, or every key when `prefix` is None.
    ///
    /// A prefix matches whole path segments: `a/b` lists `a/b/c` but not
    /// `a/bc`. Returns `BackendError::NotFound` if nothing exists at the
    /// prefix and the backend can tell.
    async fn list(&self, prefix: Option<&str>) -> Result<KeyBatches>;

    /// Read the full contents stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Store `data` under `key`, replacing any existing value.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Store the contents of a local file under `key`.
    async fn put_file(&self, key: &str, path: &Path) -> Result<()> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| BackendError::from_io(&path.display().to_string(), e))?;
        self.put(key, Bytes::from(data)).await
    }

    /// Whether `key` names a plain file (as opposed to a directory or nothing).
    async fn is_file(&self, key: &str) -> Result<bool>;

    /// Create the directory `key` and its parents, if the backend has
    /// directories at all.
    ///
    /// Backends without real directories return `BackendError::Unsupported`.
    async fn make_dirs(&self, key: &str) -> Result<()> {
        Err(BackendError::Unsupported(format!("make_dirs({})", key)))
    }
}
