//! Directory subcommands: `load` and `persist`.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::cli::{CommandContext, FilterArgs, OutputSink, Result};
use crate::directory::{DirectoryLoader, DirectoryPersister, TransferStats};
use crate::filter::PathFilter;
use crate::reference::Reference;

/// Summary printed after a directory transfer.
#[derive(Debug, Serialize)]
struct TransferSummary<'a> {
    operation: &'a str,
    reference: String,
    directory: String,
    transferred: usize,
    skipped: usize,
    bytes: u64,
}

impl TransferSummary<'_> {
    async fn print(&self, ctx: &CommandContext) -> Result<()> {
        let output = OutputSink::default();
        if ctx.json {
            output.write_json(self).await?;
        } else {
            output
                .write_str(&format!(
                    "{}: {} file(s), {} byte(s), {} skipped",
                    self.operation, self.transferred, self.bytes, self.skipped
                ))
                .await?;
        }
        Ok(())
    }
}

fn summary<'a>(
    operation: &'a str,
    reference: &Reference,
    directory: &std::path::Path,
    stats: TransferStats,
) -> TransferSummary<'a> {
    TransferSummary {
        operation,
        reference: reference.to_string(),
        directory: directory.display().to_string(),
        transferred: stats.transferred,
        skipped: stats.skipped,
        bytes: stats.bytes,
    }
}

// =============================================================================
// Load
// =============================================================================

/// Arguments for the load command.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Reference to load from (URL, or a path within the selected store).
    pub reference: String,

    /// Local directory to load into. Created if missing.
    pub directory: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl LoadArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let reference = Reference::parse(&self.reference)?;
        let filter = ctx.filter(&self.filter)?;
        let resolver = ctx.resolver_for(&reference).await?;

        let stats = DirectoryLoader::new(resolver)
            .load(
                &reference,
                &self.directory,
                filter.as_ref().map(|f| f as &dyn PathFilter),
            )
            .await?;

        summary("load", &reference, &self.directory, stats)
            .print(ctx)
            .await
    }
}

// =============================================================================
// Persist
// =============================================================================

/// Arguments for the persist command.
#[derive(Args, Debug)]
pub struct PersistArgs {
    /// Reference to persist to (URL, or a path within the selected store).
    pub reference: String,

    /// Local directory to upload.
    pub directory: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl PersistArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let reference = Reference::parse(&self.reference)?;
        let filter = ctx.filter(&self.filter)?;
        let resolver = ctx.resolver_for(&reference).await?;

        let stats = DirectoryPersister::new(resolver)
            .persist(
                &reference,
                &self.directory,
                filter.as_ref().map(|f| f as &dyn PathFilter),
            )
            .await?;

        summary("persist", &reference, &self.directory, stats)
            .print(ctx)
            .await
    }
}
