//! Single-object subcommands: `get` and `put`.

use std::path::PathBuf;

use clap::Args;

use crate::cli::{CommandContext, OutputSink, Result};
use crate::file::{FileLoader, FilePersister};
use crate::reference::Reference;

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Reference to the object to read.
    pub reference: String,

    #[command(flatten)]
    pub output: OutputSink,
}

impl GetArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let reference = Reference::parse(&self.reference)?;
        let loader = FileLoader::new(ctx.resolver_for(&reference).await?);

        match &self.output.file {
            Some(path) => {
                loader.load_to_path(&reference, path).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                loader.load_to_writer(&reference, &mut stdout).await?;
            }
        }
        Ok(())
    }
}

/// Arguments for the put command.
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Reference to the object to write.
    pub reference: String,

    /// Local file to upload.
    pub file: PathBuf,
}

impl PutArgs {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let reference = Reference::parse(&self.reference)?;
        let persister = FilePersister::new(ctx.resolver_for(&reference).await?);
        let bytes = persister.persist_path(&reference, &self.file).await?;

        let output = OutputSink::default();
        if ctx.json {
            output
                .write_json(&serde_json::json!({
                    "reference": reference.to_string(),
                    "bytes": bytes,
                }))
                .await?;
        } else {
            output
                .write_str(&format!("put {}: {} byte(s)", reference, bytes))
                .await?;
        }
        Ok(())
    }
}
