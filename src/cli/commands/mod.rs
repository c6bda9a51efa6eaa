//! CLI subcommands.

pub mod directory;
pub mod file;
