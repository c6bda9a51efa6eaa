use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;

use super::{Result, SyncError, TransferStats};
use crate::backend::Backend;
use crate::filter::PathFilter;
use crate::prefix::NormalizedPrefix;
use crate::reference::Reference;
use crate::report::{SkipReason, TransferEvent, TransferReporter, default_reporter};
use crate::resolver::BackendResolver;
use crate::util::write_atomic;

/// Copies a remote tree into a local directory.
///
/// Loading is best-effort: a key that cannot be read or written is reported
/// as skipped and the remaining keys are still transferred.
pub struct DirectoryLoader {
    resolver: BackendResolver,
    reporter: Arc<dyn TransferReporter>,
}

impl DirectoryLoader {
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

    /// Load every key under `reference` into `destination`.
    ///
    /// A prefix with nothing under it loads zero files and succeeds.
    pub async fn load(
        &self,
        reference: &Reference,
        destination: &Path,
        filter: Option<&dyn PathFilter>,
    ) -> Result<TransferStats> {
        let (backend, prefix) = self.resolver.resolve(reference).await?;

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|source| SyncError::Io {
                path: destination.to_path_buf(),
                source,
            })?;

        let mut stats = TransferStats::default();
        let mut batches = match backend.list(prefix.as_key()).await {
            Ok(batches) => batches,
            Err(e) if e.is_not_found() => {
                tracing::debug!(prefix = %prefix, "nothing to load");
                return Ok(stats);
            }
            Err(source) => {
                return Err(SyncError::Listing {
                    prefix: prefix.to_string(),
                    source,
                });
            }
        };

        while let Some(batch) = batches.next().await {
            let keys = match batch {
                Ok(keys) => keys,
                Err(e) if e.is_not_found() => break,
                Err(source) => {
                    return Err(SyncError::Listing {
                        prefix: prefix.to_string(),
                        source,
                    });
                }
            };
            self.reporter.report(&TransferEvent::Listed {
                prefix: prefix.to_string(),
                count: keys.len(),
            });

            for key in keys {
                match self
                    .load_key(backend.as_ref(), &prefix, &key, destination, filter)
                    .await
                {
                    Ok(bytes) => stats.record_transfer(bytes),
                    Err(reason) => {
                        stats.record_skip();
                        self.reporter.report(&TransferEvent::Skipped { key, reason });
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Transfer one key, returning its size or the reason it was skipped.
    async fn load_key(
        &self,
        backend: &dyn Backend,
        prefix: &NormalizedPrefix,
        key: &str,
        destination: &Path,
        filter: Option<&dyn PathFilter>,
    ) -> std::result::Result<u64, SkipReason> {
        if key.ends_with('/') {
            return Err(SkipReason::NotAFile);
        }
        let Some(relative) = prefix.strip(key) else {
            tracing::debug!(key = %key, prefix = %prefix, "listed key outside prefix");
            return Err(SkipReason::OutsidePrefix);
        };
        if !is_safe_relative(relative) {
            tracing::debug!(key = %key, "listed key escapes destination");
            return Err(SkipReason::UnsafePath);
        }
        if filter.is_some_and(|f| !f.matches(relative)) {
            return Err(SkipReason::Filtered);
        }

        match backend.is_file(key).await {
            Ok(true) => {}
            Ok(false) => return Err(SkipReason::NotAFile),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "could not stat key");
                return Err(SkipReason::NotAFile);
            }
        }

        let data = backend
            .get(key)
            .await
            .map_err(|e| SkipReason::Failed(e.to_string()))?;

        let path = destination.join(relative);
        write_atomic(&path, &data)
            .await
            .map_err(|e| SkipReason::Failed(format!("{}: {}", path.display(), e)))?;

        let bytes = data.len() as u64;
        self.reporter.report(&TransferEvent::Downloaded {
            key: key.to_string(),
            path,
            bytes,
        });
        Ok(bytes)
    }
}

/// Whether a relative path stays inside the directory it is joined to.
fn is_safe_relative(relative: &str) -> bool {
    relative
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryBackend};
    use crate::backend::testing::RecordingBackend;
    use crate::filter::IncludeExcludeFilter;
    use crate::report::CollectingReporter;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn loader(backend: Arc<dyn Backend>) -> DirectoryLoader {
        DirectoryLoader::new(BackendResolver::with_backend(backend))
    }

    #[tokio::test]
    async fn test_load_tree_under_prefix() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("run/a.txt", Bytes::from_static(b"a")).await.unwrap();
        backend.put("run/sub/b.txt", Bytes::from_static(b"bb")).await.unwrap();
        backend.put("other/c.txt", Bytes::from_static(b"c")).await.unwrap();

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        let stats = loader(backend)
            .load(&Reference::relative("run"), &dest, None)
            .await
            .unwrap();

        assert_eq!(stats.transferred, 2);
        assert_eq!(stats.bytes, 3);
        assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"a");
        assert_eq!(std::fs::read(dest.join("sub/b.txt")).unwrap(), b"bb");
        assert!(!dest.join("c.txt").exists());
    }

    #[tokio::test]
    async fn test_load_skips_unreadable_keys() {
        let backend = Arc::new(RecordingBackend::new().deny_get("p/two.txt"));
        backend.seed("p/one.txt", b"1").await;
        backend.seed("p/two.txt", b"2").await;
        backend.seed("p/three.txt", b"3").await;

        let reporter = Arc::new(CollectingReporter::default());
        let temp_dir = TempDir::new().unwrap();
        let stats = loader(backend.clone())
            .with_reporter(reporter.clone())
            .load(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(stats.transferred, 2);
        assert_eq!(stats.skipped, 1);
        assert!(temp_dir.path().join("one.txt").is_file());
        assert!(temp_dir.path().join("three.txt").is_file());
        assert!(!temp_dir.path().join("two.txt").exists());

        let skipped = reporter.skipped();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, "p/two.txt");
        assert!(matches!(skipped[0].1, SkipReason::Failed(_)));
    }

    #[tokio::test]
    async fn test_load_missing_prefix_is_empty() {
        let backend = Arc::new(RecordingBackend::new().list_not_found());
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dest");

        let stats = loader(backend)
            .load(&Reference::relative("nothing"), &dest, None)
            .await
            .unwrap();

        assert_eq!(stats, TransferStats::default());
        assert!(dest.is_dir());
    }

    #[tokio::test]
    async fn test_load_skips_keys_outside_prefix() {
        let backend = Arc::new(
            RecordingBackend::new()
                .with_extra_listed_key("elsewhere/x.txt")
                .with_extra_listed_key("p/../escape.txt"),
        );
        backend.seed("p/in.txt", b"in").await;

        let reporter = Arc::new(CollectingReporter::default());
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dest");
        let stats = loader(backend.clone())
            .with_reporter(reporter.clone())
            .load(&Reference::relative("p"), &dest, None)
            .await
            .unwrap();

        assert_eq!(stats.transferred, 1);
        assert!(dest.join("in.txt").is_file());
        assert!(!temp_dir.path().join("escape.txt").exists());
        assert_eq!(backend.get_keys(), vec!["p/in.txt".to_string()]);

        let reasons: Vec<SkipReason> = reporter.skipped().into_iter().map(|(_, r)| r).collect();
        assert!(reasons.contains(&SkipReason::OutsidePrefix));
        assert!(reasons.contains(&SkipReason::UnsafePath));
    }

    #[tokio::test]
    async fn test_load_applies_filter() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("app.py", Bytes::from_static(b"py")).await.unwrap();
        backend.put("readme.md", Bytes::from_static(b"md")).await.unwrap();

        let filter = IncludeExcludeFilter::new(["*.py"], Vec::<String>::new()).unwrap();
        let temp_dir = TempDir::new().unwrap();
        let stats = loader(backend)
            .load(&Reference::relative(""), temp_dir.path(), Some(&filter))
            .await
            .unwrap();

        assert_eq!(stats.transferred, 1);
        assert_eq!(stats.skipped, 1);
        assert!(temp_dir.path().join("app.py").is_file());
        assert!(!temp_dir.path().join("readme.md").exists());
    }

    #[tokio::test]
    async fn test_load_overwrites_existing_files() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("f.txt", Bytes::from_static(b"new")).await.unwrap();

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("f.txt"), "old contents").unwrap();

        loader(backend)
            .load(&Reference::relative("/"), temp_dir.path(), None)
            .await
            .unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("f.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_load_across_listing_batches() {
        let backend = Arc::new(MemoryBackend::with_batch_size(1));
        for key in ["run/a.txt", "run/b.txt", "run/sub/c.txt"] {
            backend.put(key, Bytes::from(key.to_string())).await.unwrap();
        }

        let reporter = Arc::new(CollectingReporter::default());
        let temp_dir = TempDir::new().unwrap();
        let stats = loader(backend)
            .with_reporter(reporter.clone())
            .load(&Reference::relative("run"), temp_dir.path(), None)
            .await
            .unwrap();

        assert_eq!(stats.transferred, 3);
        assert_eq!(std::fs::read(temp_dir.path().join("sub/c.txt")).unwrap(), b"run/sub/c.txt");
        let listed = reporter
            .events()
            .into_iter()
            .filter(|e| matches!(e, TransferEvent::Listed { count: 1, .. }))
            .count();
        assert_eq!(listed, 3);
    }

    #[tokio::test]
    async fn test_load_listing_failure_is_an_error() {
        let backend = Arc::new(RecordingBackend::new().deny_list());
        let temp_dir = TempDir::new().unwrap();

        let err = loader(backend.clone())
            .load(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap_err();
        match err {
            SyncError::Listing { prefix, source } => {
                assert_eq!(prefix, "p");
                assert!(matches!(source, BackendError::PermissionDenied(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(backend.get_keys().is_empty());
    }

    #[tokio::test]
    async fn test_load_listing_error_mid_stream() {
        let backend = Arc::new(RecordingBackend::new().end_listing_with(BackendError::PermissionDenied));
        backend.seed("p/a.txt", b"a").await;
        let temp_dir = TempDir::new().unwrap();

        let err = loader(backend.clone())
            .load(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Listing { .. }));
        // Keys from earlier batches are already written.
        assert!(temp_dir.path().join("a.txt").is_file());
    }

    #[tokio::test]
    async fn test_load_not_found_mid_stream_ends_listing() {
        let backend = Arc::new(RecordingBackend::new().end_listing_with(BackendError::NotFound));
        backend.seed("p/a.txt", b"a").await;
        backend.seed("p/b.txt", b"b").await;
        let temp_dir = TempDir::new().unwrap();

        let stats = loader(backend)
            .load(&Reference::relative("p"), temp_dir.path(), None)
            .await
            .unwrap();
        assert_eq!(stats.transferred, 2);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn test_is_safe_relative() {
        assert!(is_safe_relative("a/b.txt"));
        assert!(!is_safe_relative("../b.txt"));
        assert!(!is_safe_relative("a//b"));
        assert!(!is_safe_relative("a/./b"));
    }
}
