// SQLite database setup and schema bootstrap
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::storage::{ensure_parent_dir, StorageError};

/// Highest schema version this build knows how to create
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Database initialization failed: {0}")]
    InitFailed(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Handle to the device database file.
///
/// No connection is held open between operations: every call to
/// [`DbConnection::open`] yields a fresh connection that is closed when it
/// goes out of scope.
#[derive(Debug, Clone)]
pub struct DbConnection {
    path: Arc<PathBuf>,
}

impl DbConnection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> DbResult<Connection> {
        let conn = Connection::open(self.path.as_path())?;
        Ok(conn)
    }
}

/// Create (if needed) and bootstrap the database at `path`
pub fn init_db(path: &Path) -> DbResult<DbConnection> {
    ensure_parent_dir(path)?;

    let db = DbConnection::new(path);
    let conn = db.open()?;
    run_migrations(&conn)?;

    log::info!("Device database ready at {}", path.display());
    Ok(db)
}

pub(crate) fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::InitFailed(format!(
            "schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version < 1 {
        migration_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
        log::info!("Applied schema version 1");
    }

    Ok(())
}

fn migration_v1(conn: &Connection) -> DbResult<()> {
    // Canonical device table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Devices (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            DeviceName TEXT,
            RoomName TEXT,
            BackgroundColor TEXT,
            IsDeviceOn INTEGER DEFAULT 0
        )",
        [],
    )?;

    // Append-only action log; DeviceId is deliberately not a foreign key
    conn.execute(
        "CREATE TABLE IF NOT EXISTS DeviceLogs (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            DeviceId INTEGER,
            Action TEXT,
            Timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_device_logs_timestamp ON DeviceLogs(Timestamp DESC)",
        [],
    )?;

    // Registry of rooms; a room's mirror table is named room_<Id>
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Rooms (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            RoomName TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_init() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let table_count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('Devices', 'DeviceLogs', 'Rooms')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 3);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_device_defaults() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO Devices (DeviceName, RoomName, BackgroundColor) VALUES ('Lamp', 'Kitchen', 'Red')",
            [],
        )
        .unwrap();
        let is_on: bool = conn
            .query_row("SELECT IsDeviceOn FROM Devices", [], |row| row.get(0))
            .unwrap();
        assert!(!is_on);

        conn.execute("INSERT INTO DeviceLogs (DeviceId, Action) VALUES (1, 'Added')", [])
            .unwrap();
        let stamped: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM DeviceLogs WHERE Timestamp IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stamped, 1);
    }

    #[test]
    fn test_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [SCHEMA_VERSION + 1])
            .unwrap();

        let result = run_migrations(&conn);
        assert!(matches!(result, Err(DbError::InitFailed(_))));
    }

    #[test]
    fn test_unreadable_schema_version_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES ('one')", [])
            .unwrap();

        let result = run_migrations(&conn);
        assert!(matches!(result, Err(DbError::Sqlite(_))));

        let devices: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'Devices'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(devices, 0);
    }

    #[test]
    fn test_unusable_parent_dir_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = init_db(&blocker.join("devices.db"));
        assert!(matches!(result, Err(DbError::Storage(StorageError::Io(_)))));
    }

    #[test]
    fn test_init_db_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("devices.db");

        let db = init_db(&path).unwrap();

        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
        // Opening an already bootstrapped store is a no-op
        init_db(&path).unwrap();
    }
}
