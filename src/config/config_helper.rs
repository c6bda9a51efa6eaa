//! Configuration helper for interpreting config values.
//!
//! The `ConfigHelper` wraps a `Config` and resolves store selections into a
//! URL plus the client options a backend for it should be built with.

use super::{Config, ConfigError, S3Settings, StoreConfig};
use crate::backend::ClientOptions;
use crate::filter::FilterConfig;

/// A store selection resolved against the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStore {
    /// The store's base URL.
    pub url: String,
    /// Options for the store's backend client.
    pub options: ClientOptions,
}

/// Helper for interpreting configuration values.
#[derive(Debug, Clone)]
pub struct ConfigHelper {
    config: Config,
}

impl ConfigHelper {
    /// Create a new ConfigHelper wrapping the given config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get a reference to the underlying config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Client options from the `[s3]` section alone.
    pub fn default_client_options(&self) -> ClientOptions {
        client_options(&self.config.s3)
    }

    /// Client options for a named store, falling back to `[s3]` per field.
    pub fn store_client_options(&self, store: &StoreConfig) -> ClientOptions {
        client_options(&store.settings).or(&self.default_client_options())
    }

    /// Resolve `--store` (a store name or a URL), falling back to
    /// `[stores] default`.
    ///
    /// Returns `None` when nothing selects a store.
    pub fn resolve_store(&self, selector: Option<&str>) -> Result<Option<ResolvedStore>, ConfigError> {
        let Some(selector) = selector.or(self.config.stores_config.default.as_deref()) else {
            return Ok(None);
        };

        if selector.contains("://") {
            return Ok(Some(ResolvedStore {
                url: selector.to_string(),
                options: self.default_client_options(),
            }));
        }

        let store = self
            .config
            .stores
            .get(selector)
            .ok_or_else(|| ConfigError::UnknownStore(selector.to_string()))?;
        Ok(Some(ResolvedStore {
            url: store.url.clone(),
            options: self.store_client_options(store),
        }))
    }

    /// The configured default filter.
    pub fn filter_config(&self) -> &FilterConfig {
        &self.config.filter
    }
}

impl From<Config> for ConfigHelper {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

fn client_options(settings: &S3Settings) -> ClientOptions {
    ClientOptions {
        endpoint_url: settings.endpoint_url.clone(),
        region: settings.region.clone(),
        allow_http: settings.allow_http,
        ..Default::default()
    }
}
