//! Storage backends.
//!
//! A [`Backend`] is the opaque capability the sync engine reads from and
//! writes to: a local directory, an in-memory map, or an S3 bucket. Backends
//! are created from a scheme and host via [`create_backend`].

mod create_backend;
mod fs_backend;
mod memory_backend;
mod object_backend;
mod s3_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use create_backend::{
    BackendCreationError, BackendSpec, BackendType, ClientOptions, create_backend,
};
pub use fs_backend::FsBackend;
pub use memory_backend::MemoryBackend;
pub use object_backend::{Backend, BackendError, KeyBatches, Result};
pub use s3_backend::{S3Backend, S3BackendConfig};
