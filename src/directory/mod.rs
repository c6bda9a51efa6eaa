//! Directory-tree synchronization.
//!
//! [`DirectoryLoader`] copies every key under a prefix into a local directory,
//! skipping items it cannot read. [`DirectoryPersister`] uploads a local
//! directory under a prefix and stops at the first failure.

mod load;
mod persist;
mod walk;

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::resolver::ResolveError;

pub use load::DirectoryLoader;
pub use persist::DirectoryPersister;
pub use walk::{RelativeEntry, walk_files};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during a directory transfer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The reference could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The local source directory does not exist.
    #[error("directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The local source path exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Listing the remote prefix failed.
    #[error("failed to list '{prefix}': {source}")]
    Listing {
        prefix: String,
        source: BackendError,
    },

    /// Transferring a single object failed.
    #[error("failed to transfer '{key}': {source}")]
    Transfer { key: String, source: BackendError },

    /// A local filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;

// =============================================================================
// Transfer Statistics
// =============================================================================

/// Counts reported by a completed transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Files written or uploaded.
    pub transferred: usize,
    /// Items skipped by the filter, as non-files, or after an error.
    pub skipped: usize,
    /// Total bytes transferred.
    pub bytes: u64,
}

impl TransferStats {
    fn record_transfer(&mut self, bytes: u64) {
        self.transferred += 1;
        self.bytes += bytes;
    }

    fn record_skip(&mut self) {
        self.skipped += 1;
    }
}
