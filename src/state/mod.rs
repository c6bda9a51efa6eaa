//! Staged saves.
//!
//! A [`SaveSession`] hands the caller an empty temporary directory. Whatever
//! the caller writes there is uploaded as one filtered batch when the session
//! is committed; a session that is aborted or dropped uploads nothing. The
//! directory is removed in every case.

mod options;
mod session;

use thiserror::Error;

use crate::directory::SyncError;

pub use options::{SaveOptions, StateOptions};
pub use session::{SaveSession, StateManager};

/// Errors that can occur during a staged save.
#[derive(Debug, Error)]
pub enum StateError {
    /// The staging directory could not be created or removed.
    #[error("staging directory error: {0}")]
    TempDir(#[source] std::io::Error),

    /// Uploading the staged files failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub type Result<T> = std::result::Result<T, StateError>;
