// Room registry and per-room mirror table sync
//
// Every distinct RoomName in Devices gets a row in Rooms; its mirror table is
// named after the registry Id (room_<Id>), never after the user-supplied name.
use rusqlite::{Connection, OptionalExtension};

use super::db::{DbConnection, DbResult};

/// Outcome of one room table sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub rooms: usize,
    pub tables_created: usize,
    pub rows_copied: usize,
}

pub fn mirror_table_name(room_id: i64) -> String {
    format!("room_{}", room_id)
}

/// Quote a generated identifier for use in SQL text
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Look up the mirror table registered for `room_name`
pub fn room_table(conn: &Connection, room_name: &str) -> DbResult<Option<String>> {
    let room_id: Option<i64> = conn
        .query_row(
            "SELECT Id FROM Rooms WHERE RoomName = ?1",
            [room_name],
            |row| row.get(0),
        )
        .optional()?;

    Ok(room_id.map(mirror_table_name))
}

pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Register `room_name` if needed and make sure its mirror table exists.
///
/// Returns the mirror table name.
pub fn ensure_room_table(conn: &Connection, room_name: &str) -> DbResult<String> {
    conn.execute(
        "INSERT OR IGNORE INTO Rooms (RoomName) VALUES (?1)",
        [room_name],
    )?;
    let room_id: i64 = conn.query_row(
        "SELECT Id FROM Rooms WHERE RoomName = ?1",
        [room_name],
        |row| row.get(0),
    )?;

    let table = mirror_table_name(room_id);
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                DeviceName TEXT,
                BackgroundColor TEXT,
                IsDeviceOn INTEGER DEFAULT 0
            )",
            quote_ident(&table)
        ),
        [],
    )?;

    Ok(table)
}

/// Distinct room names in Devices, in order of first appearance
pub fn distinct_room_names(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT RoomName FROM Devices
         WHERE RoomName IS NOT NULL
         GROUP BY RoomName
         ORDER BY MIN(Id)",
    )?;

    let rooms = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rooms)
}

/// Copy devices of `room_name` that are missing from its mirror table.
///
/// Matching is by DeviceName only. Returns the number of rows copied.
pub fn backfill_room(conn: &Connection, room_name: &str, table: &str) -> DbResult<usize> {
    let table = quote_ident(table);
    let copied = conn.execute(
        &format!(
            "INSERT INTO {table} (DeviceName, BackgroundColor, IsDeviceOn)
             SELECT DeviceName, BackgroundColor, IsDeviceOn
             FROM Devices
             WHERE RoomName = ?1
             AND NOT EXISTS (
                 SELECT 1 FROM {table} WHERE DeviceName = Devices.DeviceName
             )"
        ),
        [room_name],
    )?;
    Ok(copied)
}

/// Create missing mirror tables and backfill missing mirror rows.
///
/// Idempotent: a second pass with no intervening writes copies nothing.
pub fn sync_room_tables(db: &DbConnection) -> DbResult<SyncReport> {
    let mut conn = db.open()?;
    let tx = conn.transaction()?;

    let mut report = SyncReport::default();
    for room in distinct_room_names(&tx)? {
        let existed = match room_table(&tx, &room)? {
            Some(table) => table_exists(&tx, &table)?,
            None => false,
        };

        let table = ensure_room_table(&tx, &room)?;
        if !existed {
            report.tables_created += 1;
            log::debug!("Created mirror table {} for room {:?}", table, room);
        }

        report.rows_copied += backfill_room(&tx, &room, &table)?;
        report.rooms += 1;
    }

    tx.commit()?;

    if report.tables_created > 0 || report.rows_copied > 0 {
        log::info!(
            "Room sync: {} rooms, {} tables created, {} rows copied",
            report.rooms,
            report.tables_created,
            report.rows_copied
        );
    }

    Ok(report)
}
