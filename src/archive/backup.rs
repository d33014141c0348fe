use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::repo::{LocalStore, StoreError, TableCounts};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to back up {from:?} to {to:?}: {source}")]
    Backup {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {path:?} before recreating it: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create database: {0}")]
    Create(#[from] StoreError),
}

#[derive(Debug)]
pub struct SetupReport {
    pub backup: Option<PathBuf>,
    pub counts: TableCounts,
}

/// `harvard_db.sqlite3` on 2025-10-10 backs up to `harvard_db_2025-10-10.sqlite3`.
pub fn backup_path(db_path: &Path, date: NaiveDate) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    let name = match db_path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), ext.to_string_lossy()),
        None => format!("{}_{}", stem, date.format("%Y-%m-%d")),
    };
    db_path.with_file_name(name)
}

/// Copies the store file to its dated sibling. Returns `None` when there is
/// nothing to back up. A same-day backup is overwritten.
pub fn backup_existing(db_path: &Path, date: NaiveDate) -> Result<Option<PathBuf>, SetupError> {
    if !db_path.exists() {
        return Ok(None);
    }
    let target = backup_path(db_path, date);
    fs::copy(db_path, &target).map_err(|source| SetupError::Backup {
        from: db_path.to_path_buf(),
        to: target.clone(),
        source,
    })?;
    info!("Backed up {:?} to {:?}", db_path, target);
    Ok(Some(target))
}

/// Backup, then create. A failed backup stops the run before the store is touched.
pub fn run_setup(db_path: &Path, date: NaiveDate, reset: bool) -> Result<SetupReport, SetupError> {
    let backup = backup_existing(db_path, date)?;

    if reset && db_path.exists() {
        warn!("Recreating {:?} from scratch", db_path);
        fs::remove_file(db_path).map_err(|source| SetupError::Reset {
            path: db_path.to_path_buf(),
            source,
        })?;
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SetupError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let store = LocalStore::open(db_path)?;
    let counts = store.counts()?;
    info!(
        metadata = counts.metadata,
        media = counts.media,
        colors = counts.colors,
        "Database ready at {:?}",
        db_path
    );
    Ok(SetupReport { backup, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::client::tests::fake_record;
    use crate::ingest::flatten::flatten_record;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 10).unwrap()
    }

    fn seed(path: &Path) {
        let mut store = LocalStore::open(path).unwrap();
        let rows = flatten_record(&fake_record(1, "Paintings", 2)).unwrap();
        store
            .load(&[rows.metadata], rows.media.as_slice(), &rows.colors)
            .unwrap();
    }

    #[test]
    fn test_backup_path_embeds_date() {
        let path = Path::new("data/harvard_db.sqlite3");
        assert_eq!(backup_path(path, date()), PathBuf::from("data/harvard_db_2025-10-10.sqlite3"));
        assert_eq!(backup_path(Path::new("store"), date()), PathBuf::from("store_2025-10-10"));
    }

    #[test]
    fn test_setup_without_existing_file_skips_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("harvard_db.sqlite3");
        let report = run_setup(&path, date(), false).unwrap();
        assert!(report.backup.is_none());
        assert_eq!(report.counts, TableCounts::default());
        assert!(path.exists());
    }

    #[test]
    fn test_backup_is_byte_identical_to_previous_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("harvard_db.sqlite3");
        seed(&path);
        let before = fs::read(&path).unwrap();

        let report = run_setup(&path, date(), true).unwrap();
        let backup = report.backup.unwrap();
        assert_eq!(backup, dir.path().join("harvard_db_2025-10-10.sqlite3"));
        assert_eq!(fs::read(&backup).unwrap(), before);
        // Reset recreated an empty store.
        assert_eq!(report.counts, TableCounts::default());
    }

    #[test]
    fn test_setup_keeps_rows_without_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("harvard_db.sqlite3");
        seed(&path);
        let report = run_setup(&path, date(), false).unwrap();
        assert!(report.backup.is_some());
        assert_eq!(report.counts.metadata, 1);
        assert_eq!(report.counts.colors, 2);
    }

    #[test]
    fn test_failed_backup_stops_setup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("harvard_db.sqlite3");
        seed(&path);
        // A directory squatting on the backup name makes the copy fail.
        fs::create_dir(backup_path(&path, date())).unwrap();
        let before = fs::read(&path).unwrap();

        let err = run_setup(&path, date(), true).unwrap_err();
        assert!(matches!(err, SetupError::Backup { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
    }
}
