//! Configuration types for workstate-rs.
//!
//! This module defines the structures used to represent application configuration
//! as parsed from an INI-format config file.

use std::collections::HashMap;

use crate::filter::FilterConfig;

// =============================================================================
// S3 Settings (shared across s3 and store sections)
// =============================================================================

/// S3-specific connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    /// `None` when the section does not set it, so it can inherit.
    pub allow_http: Option<bool>,
}

// =============================================================================
// Config Sections
// =============================================================================

/// [stores] section - store selection defaults.
#[derive(Debug, Clone, Default)]
pub struct StoresConfig {
    /// Name of the store used when `--store` is not given.
    pub default: Option<String>,
}

/// [store.{name}] section - named store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub settings: S3Settings,
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// [log] section - diagnostics output.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// A `tracing` filter directive, e.g. `info` or `workstate=debug`.
    pub level: String,
    pub format: LogFormat,
}

// =============================================================================
// Top-Level Config
// =============================================================================

/// Complete application configuration as parsed from config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub s3: S3Settings,
    pub stores_config: StoresConfig,
    pub stores: HashMap<String, StoreConfig>,
    /// [filter] section - default include/exclude patterns.
    pub filter: FilterConfig,
    pub log: LogConfig,
}
