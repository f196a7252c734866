//! Source backup archive
//!
//! Zips the configured files and directories in memory and uploads the
//! archive to the object store. A failed backup is reported, never fatal.

use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info};
use walkdir::WalkDir;

use crate::storage::ObjectStore;

/// Default object key of the backup archive
pub const DEFAULT_BACKUP_KEY: &str = "code_backup/code_backup.zip";

/// Error type for archive building
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// A listed path does not exist
    #[error("Backup path not found: {0}")]
    NotFound(PathBuf),

    /// Reading a file failed
    #[error("IO error: {0}")]
    Io(String),

    /// Writing the archive failed
    #[error("Zip error: {0}")]
    Zip(String),
}

/// Result type for archive building
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// What to back up and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Upload the archive after a pipeline run
    pub enabled: bool,
    /// Files and directories to include
    pub paths: Vec<PathBuf>,
    /// Object key of the archive
    pub key: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: vec![PathBuf::from("Cargo.toml"), PathBuf::from("src")],
            key: DEFAULT_BACKUP_KEY.to_string(),
        }
    }
}

/// A built archive
#[derive(Debug, Clone)]
pub struct BackupArchive {
    /// Zip bytes
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of the zip bytes
    pub sha256: String,
    /// Entry names in the order they were written
    pub entries: Vec<String>,
}

/// Outcome of a backup upload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupReport {
    Uploaded {
        key: String,
        entries: usize,
        bytes: usize,
        sha256: String,
    },
    Failed {
        key: String,
        reason: String,
    },
}

impl BackupReport {
    /// Check whether the archive was uploaded
    pub fn is_success(&self) -> bool {
        matches!(self, BackupReport::Uploaded { .. })
    }
}

/// Entry name for a path: its normal components joined with `/`
fn entry_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Files to archive with their entry names
///
/// A file keeps its own path as entry name. Files under a directory are
/// named relative to the directory's parent, so `src/lib.rs` stays
/// `src/lib.rs`.
fn collect_entries(paths: &[PathBuf]) -> ArchiveResult<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();

    for path in paths {
        if path.is_file() {
            entries.push((path.clone(), entry_name(path)));
        } else if path.is_dir() {
            let base = path.parent().unwrap_or(Path::new(""));
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| ArchiveError::Io(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
                entries.push((entry.path().to_path_buf(), entry_name(relative)));
            }
        } else {
            return Err(ArchiveError::NotFound(path.clone()));
        }
    }

    Ok(entries)
}

/// Zip the listed files and directories with Deflate, in memory
pub fn build_archive(paths: &[PathBuf]) -> ArchiveResult<BackupArchive> {
    let files = collect_entries(paths)?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(files.len());
    for (path, name) in files {
        let content = std::fs::read(&path)
            .map_err(|e| ArchiveError::Io(format!("{}: {}", path.display(), e)))?;
        zip.start_file(name.as_str(), options)
            .map_err(|e| ArchiveError::Zip(e.to_string()))?;
        zip.write_all(&content)
            .map_err(|e| ArchiveError::Io(e.to_string()))?;
        entries.push(name);
    }

    let bytes = zip
        .finish()
        .map_err(|e| ArchiveError::Zip(e.to_string()))?
        .into_inner();
    let sha256 = format!("{:x}", Sha256::digest(&bytes));

    Ok(BackupArchive {
        bytes,
        sha256,
        entries,
    })
}

/// Build the archive and upload it to `bucket` under the configured key
pub async fn upload_backup(
    store: &dyn ObjectStore,
    bucket: &str,
    config: &BackupConfig,
) -> BackupReport {
    let archive = match build_archive(&config.paths) {
        Ok(archive) => archive,
        Err(e) => {
            error!(key = %config.key, "Failed to build backup archive: {}", e);
            return BackupReport::Failed {
                key: config.key.clone(),
                reason: e.to_string(),
            };
        }
    };

    let entries = archive.entries.len();
    let bytes = archive.bytes.len();
    match store.put_object(bucket, &config.key, archive.bytes).await {
        Ok(()) => {
            info!(
                bucket,
                key = %config.key,
                entries,
                bytes,
                sha256 = %archive.sha256,
                "Uploaded backup archive"
            );
            BackupReport::Uploaded {
                key: config.key.clone(),
                entries,
                bytes,
                sha256: archive.sha256,
            }
        }
        Err(e) => {
            error!(bucket, key = %config.key, "Failed to upload backup archive: {}", e);
            BackupReport::Failed {
                key: config.key.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryObjectStore;
    use std::io::Read;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/transform")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub mod transform;\n").unwrap();
        std::fs::write(dir.path().join("src/transform/mod.rs"), "// empty\n").unwrap();
        dir
    }

    #[test]
    fn test_build_archive_names_entries_relative_to_parent() {
        let dir = project();
        let archive = build_archive(&[dir.path().join("src")]).unwrap();

        assert_eq!(archive.entries, vec!["src/lib.rs", "src/transform/mod.rs"]);
        assert_eq!(archive.sha256.len(), 64);

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let mut content = String::new();
        zip.by_name("src/lib.rs")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "pub mod transform;\n");
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = project();
        assert!(matches!(
            build_archive(&[dir.path().join("nope")]),
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[test]
    fn test_entry_name_strips_roots() {
        assert_eq!(entry_name(Path::new("/abs/Cargo.toml")), "abs/Cargo.toml");
        assert_eq!(entry_name(Path::new("./src/main.rs")), "src/main.rs");
    }

    #[tokio::test]
    async fn test_upload_backup() {
        let dir = project();
        let store = InMemoryObjectStore::new();
        let config = BackupConfig {
            enabled: true,
            paths: vec![dir.path().join("Cargo.toml"), dir.path().join("src")],
            key: DEFAULT_BACKUP_KEY.to_string(),
        };

        let report = upload_backup(&store, "etl", &config).await;
        assert!(report.is_success());
        assert!(store.object("etl", DEFAULT_BACKUP_KEY).is_some());
    }

    #[tokio::test]
    async fn test_upload_backup_reports_build_failure() {
        let store = InMemoryObjectStore::new();
        let config = BackupConfig {
            paths: vec![PathBuf::from("/definitely/not/here")],
            ..BackupConfig::default()
        };

        let report = upload_backup(&store, "etl", &config).await;
        assert!(matches!(report, BackupReport::Failed { .. }));
        assert!(store.keys("etl").is_empty());
    }
}
