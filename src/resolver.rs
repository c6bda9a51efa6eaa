//! Turning references into a backend plus a key prefix.

use std::sync::Arc;

use thiserror::Error;

use crate::backend::{Backend, BackendCreationError, BackendSpec, ClientOptions, create_backend};
use crate::prefix::{InvalidPathError, NormalizedPrefix};
use crate::reference::{Location, Reference};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while resolving a reference.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference cannot be resolved with the resolver's configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The resolved path is not a valid prefix.
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),

    /// A backend for the reference could not be created.
    #[error(transparent)]
    BackendCreation(#[from] BackendCreationError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

// =============================================================================
// BackendResolver
// =============================================================================

/// Resolves references, either against one bound backend or by creating a
/// backend per absolute reference.
#[derive(Clone)]
pub struct BackendResolver {
    bound: Option<Arc<dyn Backend>>,
    options: ClientOptions,
}

impl std::fmt::Debug for BackendResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendResolver")
            .field("bound", &self.bound.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl BackendResolver {
    /// An unbound resolver. Absolute references get a new backend built with
    /// `options`; relative references are rejected.
    pub fn new(options: ClientOptions) -> Self {
        Self {
            bound: None,
            options,
        }
    }

    /// A resolver bound to `backend`. Every reference resolves against it.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            bound: Some(backend),
            options: ClientOptions::default(),
        }
    }

    /// The bound backend, if any.
    pub fn bound(&self) -> Option<&Arc<dyn Backend>> {
        self.bound.as_ref()
    }

    /// Resolve `reference` into the backend to use and the prefix within it.
    pub async fn resolve(
        &self,
        reference: &Reference,
    ) -> Result<(Arc<dyn Backend>, NormalizedPrefix)> {
        match (reference, &self.bound) {
            (Reference::Relative(path), Some(backend)) => {
                Ok((backend.clone(), NormalizedPrefix::new(path)?))
            }
            (Reference::Relative(path), None) => Err(ResolveError::Configuration(format!(
                "path reference '{}' requires a configured backend",
                path
            ))),
            (Reference::Absolute(location), Some(backend)) => {
                Ok((backend.clone(), NormalizedPrefix::new(&location.path)?))
            }
            (Reference::Absolute(location), None) => self.resolve_location(location).await,
        }
    }

    async fn resolve_location(
        &self,
        location: &Location,
    ) -> Result<(Arc<dyn Backend>, NormalizedPrefix)> {
        let (host, path) = location.host_and_path();
        // Validate before any client is constructed.
        let prefix = NormalizedPrefix::new(&path)?;

        let from_location = ClientOptions {
            port: location.port,
            user: location.user.clone(),
            password: location.password.clone(),
            ..Default::default()
        };
        let spec = BackendSpec::new(&location.scheme, &host, from_location.or(&self.options))?;
        let backend = create_backend(&spec).await?;

        tracing::debug!(
            reference = %location,
            backend = %backend.describe(),
            prefix = %prefix,
            "resolved reference"
        );
        Ok((backend, prefix))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_relative_requires_bound_backend() {
        let resolver = BackendResolver::new(ClientOptions::default());
        let result = resolver.resolve(&Reference::relative("a/b")).await;
        assert!(matches!(result, Err(ResolveError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_relative_against_bound_backend() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let resolver = BackendResolver::with_backend(backend.clone());

        let (resolved, prefix) = resolver.resolve(&Reference::relative("a/b/")).await.unwrap();
        assert!(Arc::ptr_eq(&resolved, &backend));
        assert_eq!(prefix.as_str(), "a/b");

        let (_, prefix) = resolver.resolve(&Reference::relative(".")).await.unwrap();
        assert!(prefix.is_root());
    }

    #[tokio::test]
    async fn test_absolute_against_bound_backend_ignores_host() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let resolver = BackendResolver::with_backend(backend.clone());

        let reference = Reference::parse("s3://elsewhere/x/y").unwrap();
        let (resolved, prefix) = resolver.resolve(&reference).await.unwrap();
        assert!(Arc::ptr_eq(&resolved, &backend));
        assert_eq!(prefix.as_str(), "x/y");
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let resolver = BackendResolver::with_backend(backend);
        let result = resolver.resolve(&Reference::relative("../etc")).await;
        assert!(matches!(result, Err(ResolveError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let resolver = BackendResolver::new(ClientOptions::default());
        let reference = Reference::parse("gopher://host/path").unwrap();
        let result = resolver.resolve(&reference).await;
        assert!(matches!(
            result,
            Err(ResolveError::BackendCreation(
                BackendCreationError::UnsupportedScheme(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_file_url_extracts_host_from_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let target = temp_dir.path().join("tree");
        let url = format!("file://{}", target.display());

        let resolver = BackendResolver::new(ClientOptions::default());
        let (backend, prefix) = resolver.resolve(&Reference::parse(&url).unwrap()).await.unwrap();

        let first = temp_dir
            .path()
            .components()
            .nth(1)
            .unwrap()
            .as_os_str()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(backend.describe(), format!("file:///{}", first));
        assert!(prefix.as_str().ends_with("tree"));

        backend
            .put(&prefix.join("probe.txt"), Bytes::from_static(b"ok"))
            .await
            .unwrap();
        assert!(target.join("probe.txt").is_file());
    }

    #[tokio::test]
    async fn test_memory_backends_are_fresh() {
        let resolver = BackendResolver::new(ClientOptions::default());
        let reference = Reference::parse("memory://store/p").unwrap();

        let (first, prefix) = resolver.resolve(&reference).await.unwrap();
        first
            .put(&prefix.join("a.txt"), Bytes::from_static(b"a"))
            .await
            .unwrap();

        let (second, _) = resolver.resolve(&reference).await.unwrap();
        assert!(!second.is_file("p/a.txt").await.unwrap());
    }
}
