use std::path::Path;
use std::sync::Arc;

use super::{Result, SyncError, TransferStats, walk_files};
use crate::backend::BackendError;
use crate::filter::PathFilter;
use crate::prefix::NormalizedPrefix;
use crate::reference::Reference;
use crate::report::{SkipReason, TransferEvent, TransferReporter, default_reporter};
use crate::resolver::BackendResolver;

/// Uploads a local directory tree under a prefix.
///
/// Persisting is all-or-abort: files are uploaded one at a time in path
/// order and the first failure ends the operation.
pub struct DirectoryPersister {
    resolver: BackendResolver,
    reporter: Arc<dyn TransferReporter>,
}

impl DirectoryPersister {
    pub fn new(resolver: BackendResolver) -> Self {
        Self {
            resolver,
            reporter: default_reporter(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn TransferReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Upload every regular file under `source` to `reference`.
    pub async fn persist(
        &self,
        reference: &Reference,
        source: &Path,
        filter: Option<&dyn PathFilter>,
    ) -> Result<TransferStats> {
        let (backend, prefix) = self.resolver.resolve(reference).await?;

        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(SyncError::NotADirectory(source.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::NotFound(source.to_path_buf()));
            }
            Err(source_err) => {
                return Err(SyncError::Io {
                    path: source.to_path_buf(),
                    source: source_err,
                });
            }
        }

        let entries = walk_files(source).await.map_err(|e| SyncError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;

        let mut stats = TransferStats::default();
        for entry in entries {
            let key = prefix.join(&entry.relative);
            if filter.is_some_and(|f| !f.matches(&entry.relative)) {
                stats.record_skip();
                self.reporter.report(&TransferEvent::Skipped {
                    key,
                    reason: SkipReason::Filtered,
                });
                continue;
            }

            if let Some(parent) = NormalizedPrefix::parent_of(&key) {
                match backend.make_dirs(parent).await {
                    Ok(()) | Err(BackendError::Unsupported(_)) => {}
                    Err(source) => {
                        return Err(SyncError::Transfer {
                            key: parent.to_string(),
                            source,
                        });
                    }
                }
            }

            backend
                .put_file(&key, &entry.path)
                .await
                .map_err(|source| SyncError::Transfer {
                    key: key.clone(),
                    source,
                })?;

            stats.record_transfer(entry.size);
            self.reporter.report(&TransferEvent::Uploaded {
                key,
                path: entry.path,
                bytes: entry.size,
            });
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::backend::{Backend, FsBackend, MemoryBackend};
    use crate::directory::DirectoryLoader;
    use crate::filter::IncludeExcludeFilter;
    use tempfile::TempDir;

    fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (relative, contents) in files {
            let path = root.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
    }

    #[tokio::test]
    async fn test_persist_with_prefix_and_filter() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path(), &[("app.py", "print()"), ("readme.md", "# hi")]);

        let backend = Arc::new(MemoryBackend::new());
        let persister = DirectoryPersister::new(BackendResolver::with_backend(backend.clone()));
        let filter = IncludeExcludeFilter::new(["*.py"], Vec::<String>::new()).unwrap();

        let stats = persister
            .persist(&Reference::relative("backup/2024"), temp_dir.path(), Some(&filter))
            .await
            .unwrap();

        assert_eq!(stats.transferred, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(backend.keys(), vec!["backup/2024/app.py".to_string()]);
    }

    #[tokio::test]
    async fn test_persist_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(
            temp_dir.path(),
            &[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")],
        );

        let backend = Arc::new(RecordingBackend::new().fail_put_on_call(2));
        let persister = DirectoryPersister::new(BackendResolver::with_backend(backend.clone()));

        let err = persister
            .persist(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap_err();

        match err {
            SyncError::Transfer { key, source } => {
                assert_eq!(key, "p/b.txt");
                assert!(matches!(source, BackendError::PermissionDenied(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(backend.put_count(), 2);
        assert_eq!(backend.stored_keys(), vec!["p/a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_persist_requests_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path(), &[("top.txt", "t"), ("sub/deep/x.txt", "x")]);

        let backend = Arc::new(RecordingBackend::new());
        let persister = DirectoryPersister::new(BackendResolver::with_backend(backend.clone()));
        persister
            .persist(&Reference::relative(""), temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(backend.make_dirs_keys(), vec!["sub/deep".to_string()]);
        assert_eq!(
            backend.put_keys(),
            vec!["sub/deep/x.txt".to_string(), "top.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_persist_aborts_when_make_dirs_fails() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path(), &[("sub/x.txt", "x"), ("top.txt", "t")]);

        let backend = Arc::new(RecordingBackend::new().fail_make_dirs());
        let persister = DirectoryPersister::new(BackendResolver::with_backend(backend.clone()));
        let err = persister
            .persist(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap_err();

        match err {
            SyncError::Transfer { key, source } => {
                assert_eq!(key, "p/sub");
                assert!(matches!(source, BackendError::Io(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(backend.put_count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_persist_rejects_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path(), &[("ok.txt", "o")]);
        std::fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), "b").unwrap();

        let backend = Arc::new(RecordingBackend::new());
        let persister = DirectoryPersister::new(BackendResolver::with_backend(backend.clone()));
        let err = persister
            .persist(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap_err();

        match err {
            SyncError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(backend.put_count(), 0);
    }

    #[tokio::test]
    async fn test_persist_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(RecordingBackend::new());
        let persister = DirectoryPersister::new(BackendResolver::with_backend(backend.clone()));

        let missing = temp_dir.path().join("missing");
        let err = persister
            .persist(&Reference::relative("p"), &missing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(path) if path == missing));

        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = persister
            .persist(&Reference::relative("p"), &file, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotADirectory(_)));
        assert_eq!(backend.put_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_through_filesystem_backend() {
        let source = TempDir::new().unwrap();
        write_tree(
            source.path(),
            &[("a.txt", "alpha"), ("nested/b.bin", "beta"), ("nested/deeper/c", "")],
        );

        let store = TempDir::new().unwrap();
        let backend: Arc<dyn Backend> = Arc::new(FsBackend::new(store.path()));
        let resolver = BackendResolver::with_backend(backend);

        DirectoryPersister::new(resolver.clone())
            .persist(&Reference::relative("snap"), source.path(), None)
            .await
            .unwrap();

        let dest = TempDir::new().unwrap();
        let stats = DirectoryLoader::new(resolver)
            .load(&Reference::relative("snap"), dest.path(), None)
            .await
            .unwrap();

        assert_eq!(stats.transferred, 3);
        let original = walk_files(source.path()).await.unwrap();
        let loaded = walk_files(dest.path()).await.unwrap();
        assert_eq!(
            original.iter().map(|e| &e.relative).collect::<Vec<_>>(),
            loaded.iter().map(|e| &e.relative).collect::<Vec<_>>()
        );
        for entry in &original {
            assert_eq!(
                std::fs::read(&entry.path).unwrap(),
                std::fs::read(dest.path().join(&entry.relative)).unwrap()
            );
        }
    }
}
