use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::Path;
use walkdir::WalkDir;

/// Copy a single file, carrying over its permissions and modification time
pub fn copy_file(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .with_context(|| format!("Failed to copy {:?} to {:?}", source, target))?;

    let metadata =
        fs::metadata(source).with_context(|| format!("Failed to stat {:?}", source))?;

    // Not every platform reports mtime; the copy itself still stands.
    if let Ok(modified) = metadata.modified() {
        // Read-only copies keep their mode; futimens only needs ownership.
        #[cfg(unix)]
        let file = File::open(target);
        #[cfg(not(unix))]
        let file = File::options().write(true).open(target);

        let file = file.with_context(|| format!("Failed to open {:?}", target))?;
        file.set_modified(modified)
            .with_context(|| format!("Failed to set modification time on {:?}", target))?;
    }

    Ok(())
}

/// Recursively copy `source` into `target`, following symlinks.
///
/// `target` and its subdirectories are created as needed. Empty
/// directories are kept. Returns the number of files copied.
pub fn copy_dir(source: &Path, target: &Path) -> Result<usize> {
    let mut copied = 0usize;

    for entry in WalkDir::new(source)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", source))?;
        let relative = entry.path().strip_prefix(source).with_context(|| {
            format!(
                "Failed to build relative path from {:?} to {:?}",
                source,
                entry.path()
            )
        })?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .with_context(|| format!("Failed to create directory {:?}", destination))?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &destination)?;
            copied += 1;
        } else {
            tracing::warn!(path = ?entry.path(), "skipping special file");
        }
    }

    Ok(copied)
}
