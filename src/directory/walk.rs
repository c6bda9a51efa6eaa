use std::path::{Path, PathBuf};

use tokio::fs;

/// A regular file found under a directory root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeEntry {
    /// The file's full local path.
    pub path: PathBuf,
    /// The path relative to the root, `/`-separated.
    pub relative: String,
    /// File size in bytes at the time of the walk.
    pub size: u64,
}

/// Recursively enumerate the regular files under `root`.
///
/// Directories are descended without a depth limit; symlinks and other
/// non-regular entries are left out. Entries come back sorted by relative
/// path. A name that is not valid UTF-8 cannot become a key and fails the
/// walk with `InvalidData`.
pub async fn walk_files(root: &Path) -> std::io::Result<Vec<RelativeEntry>> {
    let mut entries = Vec::new();
    let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, relative_dir)) = pending.pop() {
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("file name is not valid UTF-8: {}", entry.path().display()),
                ));
            };
            let relative = if relative_dir.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", relative_dir, name)
            };

            // `DirEntry::file_type` does not follow symlinks.
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push((entry.path(), relative));
            } else if file_type.is_file() {
                let size = entry.metadata().await?.len();
                entries.push(RelativeEntry {
                    path: entry.path(),
                    relative,
                    size,
                });
            }
        }
    }

    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(entries)
}
