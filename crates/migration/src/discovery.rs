use crate::checksum::sha256_hex;
use crate::error::MigrationDiscoveryError;
use crate::model::Migration;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const MIGRATION_SUFFIX: &str = ".sql";

/// Lists every `*.sql` file directly under `dir`, sorted by filename.
///
/// Ordering is byte-wise on the filename, so `010_x.sql` sorts after
/// `002_y.sql` but `10_x.sql` sorts before `2_y.sql`; callers pick a prefix
/// scheme that makes lexical order the intended order. Files without the
/// suffix and subdirectories are ignored. An empty directory yields an empty
/// list.
pub fn discover_migrations(dir: impl AsRef<Path>) -> Result<Vec<Migration>, MigrationDiscoveryError> {
    let dir = dir.as_ref();
    let dir_display = dir.display().to_string();

    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MigrationDiscoveryError::DirectoryNotFound {
            dir: dir_display.clone(),
        },
        _ if dir.is_file() => MigrationDiscoveryError::NotADirectory {
            dir: dir_display.clone(),
        },
        _ => MigrationDiscoveryError::Io {
            path: dir_display.clone(),
            message: e.to_string(),
        },
    })?;

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigrationDiscoveryError::Io {
            path: dir_display.clone(),
            message: e.to_string(),
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) if raw.to_string_lossy().ends_with(MIGRATION_SUFFIX) => {
                return Err(MigrationDiscoveryError::InvalidEncoding {
                    path: path.display().to_string(),
                    message: "file name is not valid UTF-8".to_string(),
                });
            }
            Err(raw) => {
                tracing::debug!(filename = %raw.to_string_lossy(), "ignoring non-migration file");
                continue;
            }
        };
        if !filename.ends_with(MIGRATION_SUFFIX) {
            tracing::debug!(%filename, "ignoring non-migration file");
            continue;
        }

        files.push((filename, path));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::with_capacity(files.len());
    for (filename, path) in files {
        let bytes = fs::read(&path).map_err(|e| MigrationDiscoveryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let checksum = sha256_hex(&bytes);
        let sql = String::from_utf8(bytes).map_err(|e| MigrationDiscoveryError::InvalidEncoding {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        out.push(Migration::new(filename, path, checksum, sql));
    }

    tracing::debug!(dir = %dir_display, count = out.len(), "discovered migrations");

    Ok(out)
}
