//! Transfer reporting.
//!
//! Sync operations describe their progress as [`TransferEvent`]s handed to an
//! injected [`TransferReporter`]. The default reporter forwards them to
//! `tracing`; tests and embedders can capture or drop them instead.

use std::path::PathBuf;
use std::sync::Arc;

/// Why an item was left out of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The filter rejected the relative path.
    Filtered,
    /// The listed key does not lie under the listed prefix.
    OutsidePrefix,
    /// The relative path would escape the destination directory.
    UnsafePath,
    /// The key is not a plain file.
    NotAFile,
    /// Reading or writing the item failed; the message describes how.
    Failed(String),
}

/// A single observable step of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A listing batch arrived.
    Listed { prefix: String, count: usize },
    /// A key was written to a local file.
    Downloaded { key: String, path: PathBuf, bytes: u64 },
    /// A local file was stored under a key.
    Uploaded { key: String, path: PathBuf, bytes: u64 },
    /// An item was skipped.
    Skipped { key: String, reason: SkipReason },
    /// A save session uploaded its staging directory.
    Committed { prefix: String, files: usize },
    /// A save session was dropped without uploading.
    Discarded { path: PathBuf },
}

/// Receives transfer events.
pub trait TransferReporter: Send + Sync {
    fn report(&self, event: &TransferEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TransferReporter for TracingReporter {
    fn report(&self, event: &TransferEvent) {
        match event {
            TransferEvent::Listed { prefix, count } => {
                tracing::debug!(prefix = %prefix, count, "listed keys");
            }
            TransferEvent::Downloaded { key, path, bytes } => {
                tracing::info!(key = %key, path = %path.display(), bytes, "downloaded file");
            }
            TransferEvent::Uploaded { key, path, bytes } => {
                tracing::info!(key = %key, path = %path.display(), bytes, "uploaded file");
            }
            TransferEvent::Skipped {
                key,
                reason: SkipReason::Failed(message),
            } => {
                tracing::warn!(key = %key, error = %message, "skipped file after error");
            }
            TransferEvent::Skipped { key, reason } => {
                tracing::debug!(key = %key, reason = ?reason, "skipped file");
            }
            TransferEvent::Committed { prefix, files } => {
                tracing::info!(prefix = %prefix, files, "committed save session");
            }
            TransferEvent::Discarded { path } => {
                tracing::info!(path = %path.display(), "discarded save session");
            }
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl TransferReporter for NoopReporter {
    fn report(&self, _event: &TransferEvent) {}
}

/// The reporter used when none is supplied.
pub fn default_reporter() -> Arc<dyn TransferReporter> {
    Arc::new(TracingReporter)
}

/// Collects events in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CollectingReporter {
    events: std::sync::Mutex<Vec<TransferEvent>>,
}

#[cfg(test)]
impl CollectingReporter {
    pub(crate) fn events(&self) -> Vec<TransferEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn skipped(&self) -> Vec<(String, SkipReason)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TransferEvent::Skipped { key, reason } => Some((key, reason)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl TransferReporter for CollectingReporter {
    fn report(&self, event: &TransferEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
