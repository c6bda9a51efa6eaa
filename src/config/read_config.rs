//! Configuration file reading and parsing.
//!
//! This module handles locating, reading, and parsing INI-format configuration files,
//! with support for layered overrides.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

use super::{Config, LogConfig, LogFormat, S3Settings, StoreConfig, StoresConfig};
use crate::filter::FilterConfig;

// =============================================================================
// Constants - Default Values
// =============================================================================

const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_CONFIG_FILE: &str = "WORKSTATE_CONFIG_FILE";
const DEFAULT_CONFIG_FILENAME: &str = ".workstateconfig";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid log format '{0}': expected 'text' or 'json'")]
    InvalidLogFormat(String),

    #[error("invalid override key '{key}': {message}")]
    InvalidOverrideKey { key: String, message: String },

    #[error("missing required field '{field}' in section '{section}'")]
    MissingRequiredField { section: String, field: String },

    #[error("unknown store '{0}'")]
    UnknownStore(String),
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// ConfigSource
// =============================================================================

/// Specifies how to locate and layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Explicit config file path from CLI. If specified and doesn't exist, error.
    /// If None, fall back to WORKSTATE_CONFIG_FILE env var, then ~/.workstateconfig.
    pub config_file: Option<PathBuf>,

    /// Additional override config file (layered on top of base config).
    pub override_file: Option<PathBuf>,

    /// Individual key=value overrides (applied last).
    /// Keys use dot-notation: "log.level", "store.backups.url"
    pub overrides: Vec<(String, String)>,
}

// =============================================================================
// Value Parsing
// =============================================================================

/// Parse an optional boolean. Returns None if the key is not present.
fn parse_bool(ini: &Ini, section: &str, key: &str) -> Result<Option<bool>> {
    ini.get(section, key)
        .map(|v| parse_bool_value(key, &v))
        .transpose()
}

fn parse_bool_value(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.trim().to_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
    }
}

/// Parse a comma-separated string into a Vec of trimmed strings.
fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// =============================================================================
// Config File Resolution
// =============================================================================

/// Information about how the config file was resolved.
#[derive(Debug)]
pub struct ResolvedConfigFile {
    /// The path to the config file, if one was found.
    pub path: Option<PathBuf>,
    /// Warning message if env var pointed to nonexistent file.
    pub warning: Option<String>,
}

/// Resolve which config file to use based on the ConfigSource and environment.
fn resolve_config_file(source: &ConfigSource) -> Result<ResolvedConfigFile> {
    // If explicit path provided, it must exist
    if let Some(ref path) = source.config_file {
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path.clone()),
                warning: None,
            });
        } else {
            return Err(ConfigError::FileNotFound(path.clone()));
        }
    }

    if let Ok(env_path) = env::var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path),
                warning: None,
            });
        } else {
            // Warn but continue with defaults
            return Ok(ResolvedConfigFile {
                path: None,
                warning: Some(format!(
                    "config file specified by {} does not exist: {}",
                    ENV_CONFIG_FILE, env_path
                )),
            });
        }
    }

    if let Some(home) = home_dir() {
        let default_path = home.join(DEFAULT_CONFIG_FILENAME);
        if default_path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(default_path),
                warning: None,
            });
        }
    }

    Ok(ResolvedConfigFile {
        path: None,
        warning: None,
    })
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

// =============================================================================
// Default Config
// =============================================================================

/// Create a Config with all default values.
fn default_config() -> Config {
    Config {
        s3: S3Settings::default(),
        stores_config: StoresConfig::default(),
        stores: HashMap::new(),
        filter: FilterConfig::default(),
        log: LogConfig {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Text,
        },
    }
}

// =============================================================================
// INI Parsing
// =============================================================================

/// Parse S3 settings from an INI section.
fn parse_s3_settings(ini: &Ini, section: &str) -> Result<S3Settings> {
    Ok(S3Settings {
        endpoint_url: ini.get(section, "endpoint_url"),
        region: ini.get(section, "region"),
        allow_http: parse_bool(ini, section, "allow_http")?,
    })
}

/// Copy the settings `from` sets onto `to`.
fn apply_settings_if_set(to: &mut S3Settings, from: S3Settings) {
    if from.endpoint_url.is_some() {
        to.endpoint_url = from.endpoint_url;
    }
    if from.region.is_some() {
        to.region = from.region;
    }
    if from.allow_http.is_some() {
        to.allow_http = from.allow_http;
    }
}

/// Apply an INI file's contents to a Config, layering on top of existing values.
fn apply_ini_to_config(config: &mut Config, ini: &Ini) -> Result<()> {
    // [s3] section
    let s3_settings = parse_s3_settings(ini, "s3")?;
    apply_settings_if_set(&mut config.s3, s3_settings);

    // [stores] section
    if let Some(default) = ini.get("stores", "default") {
        config.stores_config.default = Some(default);
    }

    // [filter] section
    if let Some(include) = ini.get("filter", "include") {
        config.filter.include = parse_comma_separated(&include);
    }
    if let Some(exclude) = ini.get("filter", "exclude") {
        config.filter.exclude = parse_comma_separated(&exclude);
    }

    // [log] section
    if let Some(level) = ini.get("log", "level") {
        config.log.level = level;
    }
    if let Some(format) = ini.get("log", "format") {
        config.log.format = parse_log_format(&format)?;
    }

    // [store.*] sections
    for section_name in ini.sections() {
        if let Some(store_name) = section_name.strip_prefix("store.") {
            let url =
                ini.get(&section_name, "url")
                    .ok_or_else(|| ConfigError::MissingRequiredField {
                        section: section_name.clone(),
                        field: "url".to_string(),
                    })?;

            let store_config = StoreConfig {
                url,
                settings: parse_s3_settings(ini, &section_name)?,
            };

            config.stores.insert(store_name.to_string(), store_config);
        }
    }

    Ok(())
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

// =============================================================================
// Override Application
// =============================================================================

/// Apply a single key=value override to the config.
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.splitn(3, '.').collect();

    match parts.as_slice() {
        ["s3", param] => apply_settings_override(&mut config.s3, "s3", param, value),

        ["stores", "default"] => {
            config.stores_config.default = Some(value.to_string());
            Ok(())
        }

        ["filter", "include"] => {
            config.filter.include = parse_comma_separated(value);
            Ok(())
        }
        ["filter", "exclude"] => {
            config.filter.exclude = parse_comma_separated(value);
            Ok(())
        }

        ["log", "level"] => {
            config.log.level = value.to_string();
            Ok(())
        }
        ["log", "format"] => {
            config.log.format = parse_log_format(value)?;
            Ok(())
        }

        // store.name.param
        ["store", name, param] => apply_store_override(config, name, param, value),

        _ => Err(ConfigError::InvalidOverrideKey {
            key: key.to_string(),
            message: "unrecognized key format".to_string(),
        }),
    }
}

fn apply_settings_override(
    settings: &mut S3Settings,
    section: &str,
    param: &str,
    value: &str,
) -> Result<()> {
    match param {
        "endpoint_url" => {
            settings.endpoint_url = Some(value.to_string());
            Ok(())
        }
        "region" => {
            settings.region = Some(value.to_string());
            Ok(())
        }
        "allow_http" => {
            settings.allow_http = Some(parse_bool_value(param, value)?);
            Ok(())
        }
        _ => Err(ConfigError::InvalidOverrideKey {
            key: format!("{}.{}", section, param),
            message: "unknown parameter".to_string(),
        }),
    }
}

fn apply_store_override(config: &mut Config, name: &str, param: &str, value: &str) -> Result<()> {
    let store = config
        .stores
        .entry(name.to_string())
        .or_insert_with(|| StoreConfig {
            url: String::new(),
            settings: S3Settings::default(),
        });

    match param {
        "url" => {
            store.url = value.to_string();
            Ok(())
        }
        _ => apply_settings_override(&mut store.settings, &format!("store.{}", name), param, value),
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Result of reading configuration, including any warnings.
#[derive(Debug)]
pub struct ConfigResult {
    /// The parsed configuration.
    pub config: Config,
    /// Any warnings generated during config loading.
    pub warnings: Vec<String>,
}

/// Read and parse configuration from the specified sources.
///
/// Configuration is layered in this order:
/// 1. Built-in defaults
/// 2. Base config file (from CLI, env var, or ~/.workstateconfig)
/// 3. Override config file (if specified)
/// 4. Individual overrides (applied last)
pub fn read_config(source: &ConfigSource) -> Result<ConfigResult> {
    let mut warnings = Vec::new();

    let mut config = default_config();

    let resolved = resolve_config_file(source)?;
    if let Some(warning) = resolved.warning {
        warnings.push(warning);
    }
    if let Some(ref path) = resolved.path {
        let ini = load_ini(path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    if let Some(ref override_path) = source.override_file {
        if !override_path.exists() {
            return Err(ConfigError::FileNotFound(override_path.clone()));
        }
        let ini = load_ini(override_path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    for (key, value) in &source.overrides {
        apply_override(&mut config, key, value)?;
    }

    // A store named only through overrides still needs a URL.
    for (name, store) in &config.stores {
        if store.url.is_empty() {
            return Err(ConfigError::MissingRequiredField {
                section: format!("store.{}", name),
                field: "url".to_string(),
            });
        }
    }

    Ok(ConfigResult { config, warnings })
}

// =============================================================================
// Tests
// =============================================================================
