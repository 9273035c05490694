//! Runtime configuration.
//! The database lives in the per-user app data directory unless overridden.

use std::path::PathBuf;

use crate::state::storage::{default_db_path, StorageResult};

pub const DB_PATH_ENV: &str = "SMART_HOME_DB_PATH";

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding devices, rooms and the action log.
    pub db_path: PathBuf,
}

impl Config {
    pub fn from_env() -> StorageResult<Self> {
        let db_path = match std::env::var(DB_PATH_ENV) {
            Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
            _ => default_db_path()?,
        };
        Ok(Self { db_path })
    }

    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that set or read DB_PATH_ENV must hold this lock
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_env_override() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.db");
        std::env::set_var(DB_PATH_ENV, format!("  {}  ", path.display()));

        let config = Config::from_env().unwrap();
        std::env::remove_var(DB_PATH_ENV);

        assert_eq!(config.db_path, path);
    }

    #[test]
    fn test_blank_env_value_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var(DB_PATH_ENV, "   ");

        let config = Config::from_env();
        std::env::remove_var(DB_PATH_ENV);

        // The default lives under the user data dir, which may be absent in CI
        if let Ok(config) = config {
            assert!(config.db_path.ends_with("devices.db"));
        }
    }

    #[test]
    fn test_with_db_path() {
        let config = Config::with_db_path("devices.db");
        assert_eq!(config.db_path, PathBuf::from("devices.db"));
    }
}
