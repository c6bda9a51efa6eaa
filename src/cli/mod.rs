//! Command-line interface for workstate.

pub mod args;
mod command_context;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogConfig, LogFormat};

pub use args::{FilterArgs, GlobalArgs, OutputSink};
pub use command_context::{CommandContext, CommandContextError};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument processing error.
    #[error("{0}")]
    Args(#[from] args::ArgsError),

    /// Configuration or context error.
    #[error("{0}")]
    Context(#[from] CommandContextError),

    /// The reference argument could not be parsed.
    #[error("{0}")]
    Reference(#[from] crate::reference::ReferenceError),

    /// Directory transfer error.
    #[error("{0}")]
    Sync(#[from] crate::directory::SyncError),

    /// Single-object transfer error.
    #[error("{0}")]
    File(#[from] crate::file::FileError),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// workstate - Move file trees between local disk and object stores.
#[derive(Parser, Debug)]
#[command(name = "workstate", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy every file under a reference into a local directory.
    Load(commands::directory::LoadArgs),

    /// Upload a local directory under a reference.
    Persist(commands::directory::PersistArgs),

    /// Read a single object.
    Get(commands::file::GetArgs),

    /// Write a single object from a local file.
    Put(commands::file::PutArgs),
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext::new(&self.global)?;
        init_logging(&ctx.helper.config().log);

        match self.command {
            Command::Load(args) => args.run(&ctx).await,
            Command::Persist(args) => args.run(&ctx).await,
            Command::Get(args) => args.run(&ctx).await,
            Command::Put(args) => args.run(&ctx).await,
        }
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// the configured level. Logs go to stderr so stdout stays clean for output.
fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let (text, json) = match log.format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    // Fails only if a subscriber is already installed, which is fine.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init();
}

/// Main entry point for the CLI.
pub async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.run().await
}
