//! Caller-supplied references to a location in some key space.
//!
//! A [`Reference`] is either a fully self-describing [`Location`]
//! (`scheme://host/path`) or a bare relative path that only has meaning
//! against a backend the caller configured up front.

use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

/// Errors that can occur when parsing a reference.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The string looked like a URL but could not be parsed as one.
    #[error("invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        source: url::ParseError,
    },

    /// The URL path was not valid UTF-8 after percent-decoding.
    #[error("invalid URL path '{0}': not valid UTF-8")]
    InvalidEncoding(String),
}

/// A fully-qualified location: scheme, optional authority parts, and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub scheme: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Percent-decoded path, as it appears after the authority.
    pub path: String,
}

impl Location {
    /// Build a location from an already-validated URL.
    ///
    /// Empty hosts and user names are reported as absent.
    pub fn from_url(url: &Url) -> Result<Self, ReferenceError> {
        let path = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|_| ReferenceError::InvalidEncoding(url.path().to_string()))?
            .into_owned();
        let password = url
            .password()
            .map(|p| {
                percent_decode_str(p)
                    .decode_utf8()
                    .map(|s| s.into_owned())
                    .map_err(|_| ReferenceError::InvalidEncoding(p.to_string()))
            })
            .transpose()?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: url.host_str().filter(|h| !h.is_empty()).map(str::to_string),
            port: url.port(),
            user: Some(url.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password,
            path,
        })
    }

    /// Split the location into the host that selects a key space and the path
    /// within it.
    ///
    /// Locations without an authority take their first path segment as the
    /// host, so `scheme:///a/b/c` yields host `a` and path `b/c`.
    pub fn host_and_path(&self) -> (String, String) {
        match &self.host {
            Some(host) => (host.clone(), self.path.clone()),
            None => {
                let mut segments = self.path.split('/').filter(|s| !s.is_empty());
                match segments.next() {
                    Some(host) => (host.to_string(), segments.collect::<Vec<_>>().join("/")),
                    None => (String::new(), String::new()),
                }
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if let Some(host) = &self.host {
            write!(f, "{}", host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}", self.path)
    }
}

/// An address for a file or tree, absolute or relative to a bound backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A self-describing location.
    Absolute(Location),
    /// A POSIX path with no scheme.
    Relative(String),
}

impl Reference {
    /// Parse a reference from a string.
    ///
    /// Strings containing `://` are parsed as URLs; anything else is a
    /// relative path.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        if input.contains("://") {
            let url = Url::parse(input).map_err(|source| ReferenceError::InvalidUrl {
                input: input.to_string(),
                source,
            })?;
            Ok(Reference::Absolute(Location::from_url(&url)?))
        } else {
            Ok(Reference::Relative(input.to_string()))
        }
    }

    /// Create a relative-path reference.
    pub fn relative(path: impl Into<String>) -> Self {
        Reference::Relative(path.into())
    }
}

impl From<Location> for Reference {
    fn from(location: Location) -> Self {
        Reference::Absolute(location)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Absolute(location) => write!(f, "{}", location),
            Reference::Relative(path) => write!(f, "{}", path),
        }
    }
}
