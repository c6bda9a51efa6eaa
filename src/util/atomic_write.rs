//! Whole-file local writes that never leave a truncated file behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

/// Counter for generating unique temp file names.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Name prefix of in-flight temp files. Listings skip entries carrying it.
pub const TEMP_FILE_PREFIX: &str = ".workstate-tmp.";

/// Generate a unique temp file path next to `path`.
fn temp_file_path(path: &Path) -> PathBuf {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    let name = format!("{}{}.{}", TEMP_FILE_PREFIX, pid, counter);
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Write `data` to `path`, creating parent directories as needed.
///
/// The data is written to a sibling temp file which is then renamed over the
/// destination, so readers see either the old contents or the complete new
/// contents. The temp file is removed if any step fails.
pub async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_file_path(path);
    if let Err(e) = fs::write(&temp_path, data).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Whether a file name belongs to an in-flight atomic write.
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_FILE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/c.txt");

        write_atomic(&path, b"hello").await.unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), b"second");
        let mut entries = fs::read_dir(temp_dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["file.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_rename_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        // A directory in the way makes the rename fail.
        let path = temp_dir.path().join("occupied");
        fs::create_dir_all(path.join("child")).await.unwrap();

        assert!(write_atomic(&path, b"data").await.is_err());

        let mut entries = fs::read_dir(temp_dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().into_owned();
            assert!(!is_temp_file_name(&name), "leftover temp file {}", name);
        }
    }
}
