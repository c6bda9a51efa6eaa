//! Normalized object-key prefixes.
//!
//! A [`NormalizedPrefix`] is the POSIX path prepended to every object key
//! during a sync operation. Construction validates and normalizes the input:
//! `.` and empty segments are dropped, leading and trailing slashes are
//! removed, and any `..` segment is rejected outright.

use std::fmt;

use thiserror::Error;

/// A prefix or path contained a parent-directory (`..`) segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path '{path}': prefix cannot contain \"..\" components")]
pub struct InvalidPathError {
    /// The path as it was supplied.
    pub path: String,
}

/// A validated key prefix. The empty value means "no prefix" (root).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPrefix(String);

impl NormalizedPrefix {
    /// The no-prefix value: keys are used unprefixed.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalize a POSIX path into a prefix.
    ///
    /// `""`, `"."` and `"/"` all produce the root prefix; `"a/b/"` and
    /// `"a/b"` produce the same value.
    pub fn new(path: &str) -> Result<Self, InvalidPathError> {
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(InvalidPathError {
                        path: path.to_string(),
                    });
                }
                s => segments.push(s),
            }
        }
        Ok(Self(segments.join("/")))
    }

    /// Whether this is the no-prefix value.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The prefix as a key string, or `None` for the root prefix.
    pub fn as_key(&self) -> Option<&str> {
        if self.is_root() { None } else { Some(&self.0) }
    }

    /// The prefix as a string (empty for root).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the object key for a path relative to this prefix.
    ///
    /// For the root prefix the relative path is returned alone, never with a
    /// leading slash.
    pub fn join(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.is_root() {
            relative.to_string()
        } else {
            format!("{}/{}", self.0, relative)
        }
    }

    /// Strip this prefix from the front of a key.
    ///
    /// Returns `None` if the key does not lie strictly under the prefix, which
    /// includes the key equal to the prefix itself.
    pub fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        if self.is_root() {
            let key = key.trim_start_matches('/');
            return if key.is_empty() { None } else { Some(key) };
        }

        let rest = key.trim_start_matches('/').strip_prefix(self.0.as_str())?;
        let rest = rest.strip_prefix('/')?;
        if rest.is_empty() { None } else { Some(rest) }
    }

    /// The parent of a key, if it has one.
    pub fn parent_of(key: &str) -> Option<&str> {
        key.rsplit_once('/')
            .map(|(parent, _)| parent)
            .filter(|parent| !parent.is_empty())
    }
}

impl fmt::Display for NormalizedPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl TryFrom<&str> for NormalizedPrefix {
    type Error = InvalidPathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::str::FromStr for NormalizedPrefix {
    type Err = InvalidPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
