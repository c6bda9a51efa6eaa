//! Backend creation from a scheme, host and client options.

use std::sync::Arc;

use thiserror::Error;

use super::{Backend, FsBackend, MemoryBackend, S3Backend, S3BackendConfig};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during backend creation.
#[derive(Debug, Error)]
pub enum BackendCreationError {
    /// The backend specification is invalid.
    #[error("invalid backend spec: {0}")]
    InvalidSpec(String),

    /// The URL scheme is not supported.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Backend creation failed.
    #[error("failed to create backend: {0}")]
    CreationError(String),
}

/// Result type for backend creation.
pub type Result<T> = std::result::Result<T, BackendCreationError>;

// =============================================================================
// Client Options
// =============================================================================

/// Options handed verbatim to the backend client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Custom endpoint URL (primarily for S3-compatible stores).
    pub endpoint_url: Option<String>,
    /// Region (primarily for S3).
    pub region: Option<String>,
    /// Port override applied to the endpoint URL.
    pub port: Option<u16>,
    /// User name or access key id.
    pub user: Option<String>,
    /// Password or secret access key.
    pub password: Option<String>,
    /// Allow plain-HTTP endpoints. Unset means no.
    pub allow_http: Option<bool>,
}

impl ClientOptions {
    /// Fill unset fields from `other`, keeping values already set here.
    pub fn or(mut self, other: &ClientOptions) -> Self {
        if self.endpoint_url.is_none() {
            self.endpoint_url = other.endpoint_url.clone();
        }
        if self.region.is_none() {
            self.region = other.region.clone();
        }
        if self.port.is_none() {
            self.port = other.port;
        }
        if self.user.is_none() {
            self.user = other.user.clone();
        }
        if self.password.is_none() {
            self.password = other.password.clone();
        }
        if self.allow_http.is_none() {
            self.allow_http = other.allow_http;
        }
        self
    }

    /// Whether plain-HTTP endpoints are permitted.
    pub fn allows_http(&self) -> bool {
        self.allow_http.unwrap_or(false)
    }
}

// =============================================================================
// Backend Specification
// =============================================================================

/// The kind of backend indicated by a scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
    /// Local filesystem (`file`).
    FileSystem,
    /// In-process memory (`memory`).
    Memory,
    /// S3-compatible storage (`s3`).
    S3,
}

impl BackendType {
    /// Map a URL scheme to a backend type.
    pub fn from_scheme(scheme: &str) -> Result<Self> {
        if scheme.is_empty() {
            return Err(BackendCreationError::InvalidSpec(
                "missing URL scheme".to_string(),
            ));
        }
        match scheme.to_ascii_lowercase().as_str() {
            "file" => Ok(BackendType::FileSystem),
            "memory" => Ok(BackendType::Memory),
            "s3" => Ok(BackendType::S3),
            other => Err(BackendCreationError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Everything needed to construct a backend.
#[derive(Debug, Clone)]
pub struct BackendSpec {
    /// The kind of backend.
    pub backend_type: BackendType,
    /// For S3: the bucket. For the filesystem: the first directory under `/`.
    pub host: String,
    /// Optional path under the host that becomes the backend's root.
    pub root: Option<String>,
    /// Client options passed through to the backend.
    pub options: ClientOptions,
}

impl BackendSpec {
    /// Build a spec from a scheme and host.
    pub fn new(scheme: &str, host: &str, options: ClientOptions) -> Result<Self> {
        let backend_type = BackendType::from_scheme(scheme)?;
        if backend_type == BackendType::S3 && host.is_empty() {
            return Err(BackendCreationError::InvalidSpec(
                "S3 URL must include bucket name".to_string(),
            ));
        }
        Ok(Self {
            backend_type,
            host: host.to_string(),
            root: None,
            options,
        })
    }

    /// Set the root path within the host.
    pub fn with_root(mut self, root: &str) -> Self {
        let root = root.trim_matches('/');
        self.root = if root.is_empty() {
            None
        } else {
            Some(root.to_string())
        };
        self
    }

    /// The endpoint URL with any port override applied.
    fn endpoint_url(&self) -> Result<Option<String>> {
        let Some(endpoint) = &self.options.endpoint_url else {
            return match self.options.port {
                Some(port) => Err(BackendCreationError::InvalidSpec(format!(
                    "port {} given without an endpoint_url",
                    port
                ))),
                None => Ok(None),
            };
        };

        let mut url = url::Url::parse(endpoint).map_err(|e| {
            BackendCreationError::InvalidSpec(format!("invalid endpoint_url '{}': {}", endpoint, e))
        })?;
        if url.scheme() == "http" && !self.options.allows_http() {
            return Err(BackendCreationError::InvalidSpec(format!(
                "endpoint_url '{}' uses plain HTTP but allow_http is not set",
                endpoint
            )));
        }
        if let Some(port) = self.options.port {
            url.set_port(Some(port)).map_err(|_| {
                BackendCreationError::InvalidSpec(format!("cannot set port on '{}'", endpoint))
            })?;
        }
        Ok(Some(url.as_str().trim_end_matches('/').to_string()))
    }
}

// =============================================================================
// Creation
// =============================================================================

/// Create a backend from a specification.
pub async fn create_backend(spec: &BackendSpec) -> Result<Arc<dyn Backend>> {
    match spec.backend_type {
        BackendType::FileSystem => {
            let mut root = std::path::PathBuf::from("/");
            if !spec.host.is_empty() {
                root.push(&spec.host);
            }
            if let Some(sub) = &spec.root {
                root.push(sub);
            }
            Ok(Arc::new(FsBackend::new(root)))
        }

        BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),

        BackendType::S3 => {
            let mut config = S3BackendConfig::new(&spec.host);
            if let Some(root) = &spec.root {
                config = config.with_root(root);
            }
            if let Some(endpoint_url) = spec.endpoint_url()? {
                config = config.with_endpoint_url(endpoint_url);
            }
            if let Some(region) = &spec.options.region {
                config = config.with_region(region);
            }
            match (&spec.options.user, &spec.options.password) {
                (Some(user), Some(password)) => {
                    config = config.with_credentials(user, password);
                }
                (None, None) => {}
                _ => {
                    return Err(BackendCreationError::InvalidSpec(
                        "S3 credentials need both an access key id and a secret".to_string(),
                    ));
                }
            }

            Ok(Arc::new(S3Backend::new(config).await))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
