use anyhow::{Context, Result};
use chrono::{Datelike, Local, Timelike};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip every regular file under `source_dir` into `archive_path`.
///
/// Entry names are relative to `source_dir`, so extracting the archive
/// reproduces the directory's contents rather than the directory itself.
/// Any existing archive is truncated. Returns the entry names in the
/// order they were written.
pub fn build_zip(source_dir: &Path, archive_path: &Path) -> Result<Vec<String>> {
    let mut files = list_relative_files(source_dir)?
        .into_iter()
        .map(|rel| Ok((normalize_rel_path(&rel)?, rel)))
        .collect::<Result<Vec<(String, PathBuf)>>>()?;
    sort_names_deterministically(&mut files);

    let zip_file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive {:?}", archive_path))?;
    let mut zip = ZipWriter::new(zip_file);
    let mut entries = Vec::with_capacity(files.len());

    for (name, rel) in files {
        let full_path = source_dir.join(rel);
        let metadata = fs::metadata(&full_path)
            .with_context(|| format!("Failed to stat {:?}", full_path))?;

        let mut options =
            FileOptions::default().compression_method(CompressionMethod::Deflated);
        if let Some(timestamp) = metadata.modified().ok().and_then(zip_timestamp) {
            options = options.last_modified_time(timestamp);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(metadata.permissions().mode() & 0o777);
        }

        let mut source = File::open(&full_path)
            .with_context(|| format!("Failed to open {:?} for archiving", full_path))?;
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", name))?;
        io::copy(&mut source, &mut zip)
            .with_context(|| format!("Failed to write {} to archive", name))?;

        tracing::debug!(entry = %name, "archived");
        entries.push(name);
    }

    zip.finish()
        .with_context(|| format!("Failed to finalize archive {:?}", archive_path))?;
    Ok(entries)
}

/// Relative paths of every regular file below `base_dir`
pub fn list_relative_files(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut rel_paths = Vec::new();

    for entry in WalkDir::new(base_dir) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", base_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(base_dir).with_context(|| {
            format!(
                "Failed to build relative path from {:?} to {:?}",
                base_dir,
                entry.path()
            )
        })?;
        rel_paths.push(rel.to_path_buf());
    }

    Ok(rel_paths)
}

/// Hex-encoded SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive order by entry name, ties broken case-sensitively
fn sort_names_deterministically(files: &mut [(String, PathBuf)]) {
    files.sort_by(|(left, _), (right, _)| {
        left.to_ascii_lowercase()
            .cmp(&right.to_ascii_lowercase())
            .then_with(|| left.cmp(right))
    });
}

/// Zip entry name for a relative path (always `/`-separated).
///
/// Names must be valid UTF-8; lossy conversion could map two files onto
/// one entry.
fn normalize_rel_path(path: &Path) -> Result<String> {
    let mut segments = Vec::new();
    for component in path.components() {
        if let Component::Normal(segment) = component {
            let segment = segment
                .to_str()
                .with_context(|| format!("File name {:?} is not valid UTF-8", path))?;
            segments.push(segment);
        }
    }
    Ok(segments.join("/"))
}

/// Local-time DOS timestamp; None outside the 1980..=2107 range zip can hold
fn zip_timestamp(modified: SystemTime) -> Option<zip::DateTime> {
    let local: chrono::DateTime<Local> = modified.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}
