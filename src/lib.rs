//! workstate-rs - Move file trees between local disk and object stores.

pub mod backend;
pub mod cli;
pub mod config;
pub mod directory;
pub mod file;
pub mod filter;
pub mod prefix;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod state;
pub mod util;

pub use backend::{Backend, BackendError, ClientOptions, FsBackend, MemoryBackend, S3Backend};
pub use directory::{DirectoryLoader, DirectoryPersister, SyncError, TransferStats};
pub use file::{FileError, FileLoader, FilePersister};
pub use filter::{FilterConfig, IncludeExcludeFilter, PathFilter};
pub use prefix::{InvalidPathError, NormalizedPrefix};
pub use reference::{Location, Reference};
pub use report::{NoopReporter, TracingReporter, TransferEvent, TransferReporter};
pub use resolver::{BackendResolver, ResolveError};
pub use state::{SaveOptions, SaveSession, StateError, StateManager, StateOptions};
