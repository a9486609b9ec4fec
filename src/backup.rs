//! Timestamped backup of raw input files before they are picked up for processing.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Working directories of a local ETL project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub raw_data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("data/raw"),
            backup_dir: PathBuf::from("data/backup"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}

/// Where a backed-up file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub backup_path: PathBuf,
    pub raw_data_path: PathBuf,
}

/// Copy `source` to `<backup_dir>/<YYYYmmdd_HHMMSS>_<name>` and to
/// `<raw_data_dir>/<name>`, creating both directories as needed.
///
/// Returns `Ok(None)` when `source` does not exist.
pub fn backup_raw_data(source: &Path, paths: &ProjectPaths) -> Result<Option<BackupOutcome>> {
    backup_raw_data_at(source, paths, Local::now())
}

#[instrument(level = "info", skip_all, fields(source = %source.display()))]
pub fn backup_raw_data_at(
    source: &Path,
    paths: &ProjectPaths,
    now: DateTime<Local>,
) -> Result<Option<BackupOutcome>> {
    if !source.is_file() {
        warn!("source file not found");
        return Ok(None);
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| anyhow!("source {} has no file name", source.display()))?
        .to_string_lossy()
        .to_string();

    fs::create_dir_all(&paths.backup_dir)
        .with_context(|| format!("creating backup directory {}", paths.backup_dir.display()))?;
    let stamp = now.format("%Y%m%d_%H%M%S");
    let backup_path = paths.backup_dir.join(format!("{}_{}", stamp, file_name));
    fs::copy(source, &backup_path)
        .with_context(|| format!("copying to {}", backup_path.display()))?;
    info!(path = %backup_path.display(), "backup created");

    fs::create_dir_all(&paths.raw_data_dir).with_context(|| {
        format!("creating raw data directory {}", paths.raw_data_dir.display())
    })?;
    let raw_data_path = paths.raw_data_dir.join(&file_name);
    // copying a file onto itself would truncate it
    if !same_file(source, &raw_data_path) {
        fs::copy(source, &raw_data_path)
            .with_context(|| format!("copying to {}", raw_data_path.display()))?;
    }
    info!(path = %raw_data_path.display(), "data copied for processing");

    Ok(Some(BackupOutcome {
        backup_path,
        raw_data_path,
    }))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
