//! Backup archives of the service state.
//!
//! A backup is a gzip tar holding the database directory and the settings
//! file under their base names, written to the configured backup location and
//! kept to the configured retention count.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::types::ServicePaths;

/// Timestamped archive filename. Colons are replaced with hyphens so the name
/// stays safe on any filesystem.
pub fn archive_name(now: DateTime<Local>) -> String {
    format!("couchback-{}.tgz", now.format("%Y-%m-%dT%H:%M:%S")).replace(':', "-")
}

/// Create the backup directory, tolerating only "already exists".
pub fn ensure_backup_dir(dir: &Path) -> Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e).with_context(|| {
            format!("Failed to create backup directory {}", dir.display())
        }),
    }
}

/// Write the archive at `archive_path`, refusing to overwrite an existing
/// file. Returns the archive size in bytes.
pub fn create_archive(paths: &ServicePaths, archive_path: &Path) -> Result<u64> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(archive_path)
        .with_context(|| format!("Failed to create archive {}", archive_path.display()))?;

    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    builder
        .append_dir_all("database", &paths.database_dir)
        .with_context(|| {
            format!(
                "Failed to archive database directory {}",
                paths.database_dir.display()
            )
        })?;
    builder
        .append_path_with_name(&paths.settings_file, "settings.conf")
        .with_context(|| {
            format!(
                "Failed to archive settings file {}",
                paths.settings_file.display()
            )
        })?;

    let encoder = builder.into_inner().context("Failed to finalize archive")?;
    let file = encoder.finish().context("Failed to finish compression")?;
    Ok(file.metadata()?.len())
}

/// Delete the oldest entries in `dir` (by modification time) until at most
/// `retention` remain. Returns the removed paths.
pub fn prune(dir: &Path, retention: usize) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list backup directory {}", dir.display()))?
    {
        let entry = entry?;
        let modified = entry.metadata()?.modified()?;
        entries.push((entry.path(), modified));
    }
    entries.sort_by_key(|(_, modified)| *modified);

    let delete_count = entries.len().saturating_sub(retention);
    let mut removed = Vec::with_capacity(delete_count);
    for (path, _) in entries.into_iter().take(delete_count) {
        debug!("Pruning old backup: {}", path.display());
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove old backup {}", path.display()))?;
        removed.push(path);
    }
    Ok(removed)
}
