use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use super::{Result, SaveOptions, StateError};
use crate::backend::Backend;
use crate::directory::{DirectoryPersister, TransferStats};
use crate::prefix::NormalizedPrefix;
use crate::reference::Reference;
use crate::report::{TransferEvent, TransferReporter, default_reporter};
use crate::resolver::BackendResolver;

/// Opens save sessions against one backend.
pub struct StateManager {
    persister: DirectoryPersister,
    reporter: Arc<dyn TransferReporter>,
}

impl StateManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let reporter = default_reporter();
        Self {
            persister: DirectoryPersister::new(BackendResolver::with_backend(backend))
                .with_reporter(reporter.clone()),
            reporter,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn TransferReporter>) -> Self {
        self.persister = self.persister.with_reporter(reporter.clone());
        self.reporter = reporter;
        self
    }

    /// Open a session with a fresh, empty staging directory.
    pub fn begin(&self) -> Result<SaveSession<'_>> {
        let dir = tempfile::Builder::new()
            .prefix("workstate-save.")
            .tempdir()
            .map_err(StateError::TempDir)?;
        tracing::debug!(path = %dir.path().display(), "opened save session");
        Ok(SaveSession {
            manager: self,
            dir: Some(dir),
        })
    }

    /// Run `work` against a staging directory and commit it if `work`
    /// succeeds.
    ///
    /// When `work` fails its error is returned and nothing is uploaded.
    pub async fn save<O, F, Fut, T, E>(&self, options: &O, work: F) -> std::result::Result<T, E>
    where
        O: SaveOptions + ?Sized,
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<StateError>,
    {
        let session = self.begin()?;
        match work(session.path().to_path_buf()).await {
            Ok(value) => {
                session.commit(options).await?;
                Ok(value)
            }
            Err(e) => {
                session.abort()?;
                Err(e)
            }
        }
    }
}

/// A staging directory whose contents are uploaded on commit.
///
/// Dropping the session without committing discards the directory.
pub struct SaveSession<'a> {
    manager: &'a StateManager,
    dir: Option<TempDir>,
}

impl SaveSession<'_> {
    /// The staging directory.
    pub fn path(&self) -> &Path {
        // `dir` is only taken by the consuming methods.
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Upload every staged file that passes the options' filter, then remove
    /// the staging directory.
    ///
    /// The directory is removed even if the upload fails.
    pub async fn commit<O>(mut self, options: &O) -> Result<TransferStats>
    where
        O: SaveOptions + ?Sized,
    {
        let Some(dir) = self.dir.take() else {
            return Ok(TransferStats::default());
        };

        let root = NormalizedPrefix::root();
        let prefix = options.prefix().unwrap_or(&root);
        let uploaded = self
            .manager
            .persister
            .persist(&Reference::relative(prefix.as_str()), dir.path(), options.filter())
            .await;
        let cleanup = dir.close();

        let stats = uploaded?;
        cleanup.map_err(StateError::TempDir)?;
        self.manager.reporter.report(&TransferEvent::Committed {
            prefix: prefix.to_string(),
            files: stats.transferred,
        });
        Ok(stats)
    }

    /// Remove the staging directory without uploading anything.
    pub fn abort(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                dir.close().map_err(StateError::TempDir)?;
                self.manager.reporter.report(&TransferEvent::Discarded { path });
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for SaveSession<'_> {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            drop(dir);
            self.manager.reporter.report(&TransferEvent::Discarded { path });
        }
    }
}
