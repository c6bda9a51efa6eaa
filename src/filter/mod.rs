//! Path filtering for directory transfers.
//!
//! A [`PathFilter`] is a pure predicate over a file's relative path. The same
//! filter is applied to remote keys during load and to local files during
//! persist, so a tree filtered on the way up filters identically on the way
//! down.

mod include_exclude;

pub use include_exclude::{FilterConfig, FilterError, IncludeExcludeFilter};

/// A predicate deciding whether a relative path takes part in a transfer.
pub trait PathFilter: Send + Sync {
    /// Return true if the file at `relative_path` should be transferred.
    ///
    /// The path is always POSIX-separated and relative to the root of the
    /// tree being synced.
    fn matches(&self, relative_path: &str) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, relative_path: &str) -> bool {
        self(relative_path)
    }
}
