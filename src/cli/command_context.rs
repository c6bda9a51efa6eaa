//! Command context for CLI commands.
//!
//! This module turns global arguments and the loaded configuration into the
//! resolver and filter a command runs with.

use thiserror::Error;

use crate::backend::{BackendCreationError, BackendSpec, create_backend};
use crate::config::{ConfigError, ConfigHelper, read_config};
use crate::filter::{FilterError, IncludeExcludeFilter};
use crate::reference::{Reference, ReferenceError};
use crate::resolver::BackendResolver;

use super::args::{FilterArgs, GlobalArgs};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during command context creation.
#[derive(Debug, Error)]
pub enum CommandContextError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A reference or store URL could not be parsed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// A store URL must be absolute.
    #[error("store '{0}' must be a URL such as s3://bucket/prefix")]
    RelativeStore(String),

    /// The store's backend could not be created.
    #[error(transparent)]
    BackendCreation(#[from] BackendCreationError),

    /// A filter pattern is invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Result type for command context operations.
pub type Result<T> = std::result::Result<T, CommandContextError>;

// =============================================================================
// CommandContext
// =============================================================================

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct CommandContext {
    pub helper: ConfigHelper,
    pub json: bool,
    store: Option<String>,
}

impl CommandContext {
    /// Load configuration and report its warnings.
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let result = read_config(&global.to_config_source())?;
        for warning in &result.warnings {
            eprintln!("Warning: {}", warning);
        }
        Ok(Self {
            helper: ConfigHelper::new(result.config),
            json: global.json,
            store: global.store.clone(),
        })
    }

    /// Build the resolver for `reference`.
    ///
    /// Absolute references get an unbound resolver using the `[s3]` client
    /// options. Relative references require a store; its URL becomes the
    /// root of a bound backend.
    pub async fn resolver_for(&self, reference: &Reference) -> Result<BackendResolver> {
        if let Reference::Absolute(_) = reference {
            return Ok(BackendResolver::new(self.helper.default_client_options()));
        }
        let Some(store) = self.helper.resolve_store(self.store.as_deref())? else {
            return Ok(BackendResolver::new(self.helper.default_client_options()));
        };

        let Reference::Absolute(location) = Reference::parse(&store.url)? else {
            return Err(CommandContextError::RelativeStore(store.url));
        };
        let (host, root) = location.host_and_path();
        let options = crate::backend::ClientOptions {
            port: location.port,
            user: location.user.clone(),
            password: location.password.clone(),
            ..Default::default()
        }
        .or(&store.options);

        let spec = BackendSpec::new(&location.scheme, &host, options)?.with_root(&root);
        let backend = create_backend(&spec).await?;
        tracing::debug!(store = %store.url, backend = %backend.describe(), "using store");
        Ok(BackendResolver::with_backend(backend))
    }

    /// Compile the filter from command-line patterns or the `[filter]`
    /// section. Returns `None` when no patterns are configured.
    pub fn filter(&self, args: &FilterArgs) -> Result<Option<IncludeExcludeFilter>> {
        let config = args.to_filter_config(self.helper.filter_config());
        if config.is_empty() {
            return Ok(None);
        }
        Ok(Some(IncludeExcludeFilter::from_config(&config)?))
    }
}
