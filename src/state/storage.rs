// File system locations for the device database
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_DIR_NAME: &str = "com.smarthome.app";
pub const DB_FILE_NAME: &str = "devices.db";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Get the app data directory, creating it if needed
pub fn get_app_data_dir() -> StorageResult<PathBuf> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
    let app_dir = data_dir.join(APP_DIR_NAME);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Default location of the device database
pub fn default_db_path() -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join(DB_FILE_NAME))
}

/// Make sure the directory holding `path` exists
pub fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_parent_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join(DB_FILE_NAME);

        ensure_parent_dir(&path).unwrap();

        assert!(dir.path().join("a").join("b").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_parent_dir_accepts_bare_file_name() {
        ensure_parent_dir(Path::new(DB_FILE_NAME)).unwrap();
    }
}
