//! Single-object transfers.
//!
//! Unlike directory transfers, a reference here names one object: its
//! normalized path is the key itself, and every failure is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::backend::{Backend, BackendError};
use crate::reference::Reference;
use crate::report::{TransferEvent, TransferReporter, default_reporter};
use crate::resolver::{BackendResolver, ResolveError};
use crate::util::write_atomic;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during a single-object transfer.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The reference resolved to the root, which cannot name an object.
    #[error("reference '{0}' does not name an object")]
    EmptyKey(String),

    #[error("failed to transfer '{key}': {source}")]
    Backend { key: String, source: BackendError },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FileError>;

/// Resolve a reference to a backend and a non-empty object key.
async fn resolve_key(
    resolver: &BackendResolver,
    reference: &Reference,
) -> Result<(Arc<dyn Backend>, String)> {
    let (backend, prefix) = resolver.resolve(reference).await?;
    match prefix.as_key() {
        Some(key) => Ok((backend, key.to_string())),
        None => Err(FileError::EmptyKey(reference.to_string())),
    }
}

// =============================================================================
// FileLoader
// =============================================================================

/// Reads single objects.
pub struct FileLoader {
    resolver: BackendResolver,
    reporter: Arc<dyn TransferReporter>,
}

impl FileLoader {
    pub fn new(resolver: BackendResolver) -> Self {
        Self {
            resolver,
            reporter: default_reporter(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn TransferReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Read the object's full contents.
    pub async fn load(&self, reference: &Reference) -> Result<Bytes> {
        let (backend, key) = resolve_key(&self.resolver, reference).await?;
        backend
            .get(&key)
            .await
            .map_err(|source| FileError::Backend { key, source })
    }

    /// Write the object to a local file, replacing it atomically.
    pub async fn load_to_path(&self, reference: &Reference, path: &Path) -> Result<u64> {
        let (backend, key) = resolve_key(&self.resolver, reference).await?;
        let data = backend
            .get(&key)
            .await
            .map_err(|source| FileError::Backend {
                key: key.clone(),
                source,
            })?;

        write_atomic(path, &data)
            .await
            .map_err(|source| FileError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let bytes = data.len() as u64;
        self.reporter.report(&TransferEvent::Downloaded {
            key,
            path: path.to_path_buf(),
            bytes,
        });
        Ok(bytes)
    }

    /// Copy the object into `writer` and flush it.
    pub async fn load_to_writer<W>(&self, reference: &Reference, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let data = self.load(reference).await?;
        let io_err = |source| FileError::Io {
            path: PathBuf::from("<writer>"),
            source,
        };
        writer.write_all(&data).await.map_err(io_err)?;
        writer.flush().await.map_err(io_err)?;
        Ok(data.len() as u64)
    }
}

// =============================================================================
// FilePersister
// =============================================================================

/// Writes single objects.
pub struct FilePersister {
    resolver: BackendResolver,
    reporter: Arc<dyn TransferReporter>,
}

impl FilePersister {
    pub fn new(resolver: BackendResolver) -> Self {
        Self {
            resolver,
            reporter: default_reporter(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn TransferReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Store `data` as the object.
    pub async fn persist(&self, reference: &Reference, data: Bytes) -> Result<()> {
        let (backend, key) = resolve_key(&self.resolver, reference).await?;
        backend
            .put(&key, data)
            .await
            .map_err(|source| FileError::Backend { key, source })
    }

    /// Upload a local file as the object.
    pub async fn persist_path(&self, reference: &Reference, path: &Path) -> Result<u64> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|source| FileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if !meta.is_file() {
            return Err(FileError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let (backend, key) = resolve_key(&self.resolver, reference).await?;
        backend
            .put_file(&key, path)
            .await
            .map_err(|source| FileError::Backend {
                key: key.clone(),
                source,
            })?;

        self.reporter.report(&TransferEvent::Uploaded {
            key,
            path: path.to_path_buf(),
            bytes: meta.len(),
        });
        Ok(meta.len())
    }
}
