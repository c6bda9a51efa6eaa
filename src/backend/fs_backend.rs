use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::fs;

use super::object_backend::{Backend, BackendError, KeyBatches, Result};
use crate::util::{is_temp_file_name, write_atomic};

/// A local-filesystem implementation of `Backend`.
///
/// Keys are paths relative to a configured root directory. Writes are atomic:
/// data goes to a sibling temp file that is then renamed into place.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Create a new filesystem backend rooted at the given path.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key against the root, refusing keys that escape it.
    fn full_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(BackendError::InvalidKey(key.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }

    /// Convert a path under the root back into a key.
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                _ => return None,
            }
        }
        Some(parts.join("/"))
    }

    /// Collect keys under `dir`, one batch per directory visited.
    async fn walk(&self, dir: PathBuf) -> Result<Vec<Vec<String>>> {
        let mut batches = Vec::new();
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(BackendError::from_io(&dir.display().to_string(), e)),
            };

            let mut files = Vec::new();
            let mut subdirs = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                if name.to_str().is_some_and(is_temp_file_name) {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    subdirs.push(entry.path());
                } else if file_type.is_file()
                    && let Some(key) = self.key_for(&entry.path())
                {
                    files.push(key);
                }
            }

            files.sort();
            if !files.is_empty() {
                batches.push(files);
            }
            // Reverse so the lexically first subdirectory is visited next.
            subdirs.sort();
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(batches)
    }
}

#[async_trait]
impl Backend for FsBackend {
    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<KeyBatches> {
        let start = match prefix {
            Some(prefix) => self.full_path(prefix)?,
            None => self.root.clone(),
        };

        match fs::metadata(&start).await {
            Ok(meta) if meta.is_dir() => {}
            // A plain file is not a directory of keys: nothing lies under it.
            Ok(_) => return Ok(Box::pin(stream::empty())),
            Err(e) => {
                return Err(BackendError::from_io(
                    prefix.unwrap_or(""),
                    e,
                ));
            }
        }

        let batches = self.walk(start).await?;
        Ok(Box::pin(stream::iter(batches.into_iter().map(Ok))))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.full_path(key)?;
        let data = fs::read(&path)
            .await
            .map_err(|e| BackendError::from_io(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.full_path(key)?;
        write_atomic(&path, &data)
            .await
            .map_err(|e| BackendError::from_io(key, e))
    }

    async fn is_file(&self, key: &str) -> Result<bool> {
        let path = self.full_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BackendError::from_io(key, e)),
        }
    }

    async fn make_dirs(&self, key: &str) -> Result<()> {
        let path = self.full_path(key)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| BackendError::from_io(key, e))
    }
}
