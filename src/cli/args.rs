//! Command-line argument definitions and helpers.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::ConfigSource;
use crate::filter::FilterConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during argument processing.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// I/O error reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for argument operations.
pub type Result<T> = std::result::Result<T, ArgsError>;

// =============================================================================
// Global Arguments
// =============================================================================

/// Global arguments that apply to all commands.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to the main configuration file.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to the configuration overrides file.
    #[arg(long = "config-file-overrides", global = true)]
    pub config_file_overrides: Option<PathBuf>,

    /// Configuration overrides in the form name=value.
    #[arg(long = "config", value_parser = parse_config_override, global = true)]
    pub config_overrides: Vec<(String, String)>,

    /// Format output as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Store that relative references resolve against (URL or named store).
    /// If not specified, the `[stores] default` store is used.
    #[arg(long = "store", global = true)]
    pub store: Option<String>,
}

impl GlobalArgs {
    /// Convert to a ConfigSource for reading configuration.
    pub fn to_config_source(&self) -> ConfigSource {
        ConfigSource {
            config_file: self.config_file.clone(),
            override_file: self.config_file_overrides.clone(),
            overrides: self.config_overrides.clone(),
        }
    }
}

/// Parse a config override from "name=value" format.
fn parse_config_override(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid config override '{}': expected name=value", s))?;
    Ok((name.to_string(), value.to_string()))
}

// =============================================================================
// Filter Arguments
// =============================================================================

/// Include/exclude patterns for directory transfers.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only transfer files whose relative path matches this glob. Repeatable.
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Skip files whose relative path matches this glob. Repeatable.
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

impl FilterArgs {
    /// The patterns given on the command line, or `configured` if none were.
    pub fn to_filter_config(&self, configured: &FilterConfig) -> FilterConfig {
        if self.include.is_empty() && self.exclude.is_empty() {
            configured.clone()
        } else {
            FilterConfig {
                include: self.include.clone(),
                exclude: self.exclude.clone(),
            }
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Helper for commands that write output to a file or stdout.
#[derive(Args, Debug, Default)]
pub struct OutputSink {
    /// Write output to this file instead of stdout.
    #[arg(id = "output_file", short = 'o', long = "output-file")]
    pub file: Option<PathBuf>,
}

impl OutputSink {
    /// Write a string value to the output.
    pub async fn write_str(&self, value: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, value).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(value.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Write a value as pretty JSON.
    pub async fn write_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let output = serde_json::to_string_pretty(value)?;
        self.write_str(&output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_override() {
        assert_eq!(
            parse_config_override("log.level=debug").unwrap(),
            ("log.level".to_string(), "debug".to_string())
        );
        assert_eq!(
            parse_config_override("filter.include=a=b").unwrap(),
            ("filter.include".to_string(), "a=b".to_string())
        );
        assert!(parse_config_override("novalue").is_err());
    }

    #[test]
    fn test_filter_args_override_config() {
        let configured = FilterConfig {
            include: vec!["*.rs".to_string()],
            exclude: vec![],
        };

        let args = FilterArgs::default();
        assert_eq!(args.to_filter_config(&configured), configured);

        let args = FilterArgs {
            include: vec![],
            exclude: vec!["target/**".to_string()],
        };
        let filter = args.to_filter_config(&configured);
        assert!(filter.include.is_empty());
        assert_eq!(filter.exclude, vec!["target/**"]);
    }
}
