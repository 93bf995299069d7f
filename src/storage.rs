use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Reads a JSON document. A missing file is `Ok(None)`, not an error.
pub fn read_json_file(path: &Path) -> Result<Option<Value>, StorageError> {
    let raw_json = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source: error,
            });
        }
    };

    let value = serde_json::from_str::<Value>(&raw_json).map_err(|error| StorageError::Json {
        path: path.to_path_buf(),
        source: error,
    })?;

    Ok(Some(value))
}

/// Serializes `payload` next to `path`, syncs it, then renames it over `path`
/// so readers only ever see the old or the new document.
pub fn write_json_atomic<T: Serialize>(path: &Path, payload: &T) -> Result<(), StorageError> {
    let io_error = |error: std::io::Error, at: &Path| StorageError::Io {
        path: at.to_path_buf(),
        source: error,
    };

    if let Some(parent_directory) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent_directory)
            .map_err(|error| io_error(error, parent_directory))?;
    }

    let serialized = serde_json::to_vec_pretty(payload).map_err(|error| StorageError::Json {
        path: path.to_path_buf(),
        source: error,
    })?;

    let temp_path = temporary_path(path);
    let write_result = File::create(&temp_path).and_then(|mut file| {
        file.write_all(&serialized)?;
        file.sync_all()
    });
    if let Err(error) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(io_error(error, &temp_path));
    }

    if let Err(error) = std::fs::rename(&temp_path, path) {
        if let Err(cleanup_error) = std::fs::remove_file(&temp_path) {
            tracing::warn!(
                temp_path = %temp_path.display(),
                error = %cleanup_error,
                "Failed to remove temporary record file"
            );
        }
        return Err(io_error(error, path));
    }

    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let Some(file_name) = path.file_name().and_then(|value| value.to_str()) else {
        return path.with_extension("json.tmp");
    };

    path.with_file_name(format!(".{file_name}.tmp"))
}
