// Row-level operations on the canonical, mirror and log tables
//
// Everything here takes a borrowed Connection so that a caller can run a
// sequence of writes inside one Transaction.
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::DbResult;
use super::models::{CreateDeviceRequest, Device, DeviceAction, DeviceLog, Room, RoomDevice};
use super::rooms::{distinct_room_names, quote_ident, room_table};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        device_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        room_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        background_color: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        is_device_on: row.get::<_, Option<bool>>(4)?.unwrap_or(false),
    })
}

fn room_device_from_row(row: &Row<'_>) -> rusqlite::Result<RoomDevice> {
    Ok(RoomDevice {
        id: row.get(0)?,
        device_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        background_color: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        is_device_on: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceLog> {
    let action: String = row.get(2)?;
    let action = DeviceAction::from_string(&action).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown device action: {}", action).into(),
        )
    })?;

    Ok(DeviceLog {
        id: row.get(0)?,
        device_id: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        action,
        timestamp: parse_timestamp(3, &row.get::<_, String>(3)?)?,
    })
}

/// Parse SQLite's CURRENT_TIMESTAMP text (UTC, no offset)
fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ==================== DEVICE QUERIES ====================

/// Insert a new canonical device, switched off
pub fn insert_device(conn: &Connection, request: &CreateDeviceRequest) -> DbResult<Device> {
    conn.execute(
        "INSERT INTO Devices (DeviceName, RoomName, BackgroundColor, IsDeviceOn)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            request.device_name,
            request.room_name,
            request.background_color,
            false,
        ],
    )?;

    Ok(Device {
        id: conn.last_insert_rowid(),
        device_name: request.device_name.clone(),
        room_name: request.room_name.clone(),
        background_color: request.background_color.clone(),
        is_device_on: false,
    })
}

/// Get a device by ID
pub fn get_device(conn: &Connection, id: i64) -> DbResult<Option<Device>> {
    let device = conn
        .query_row(
            "SELECT Id, DeviceName, RoomName, BackgroundColor, IsDeviceOn
             FROM Devices WHERE Id = ?1",
            [id],
            device_from_row,
        )
        .optional()?;
    Ok(device)
}

/// Find a device by exact name and room
pub fn find_device(conn: &Connection, device_name: &str, room_name: &str) -> DbResult<Option<Device>> {
    let device = conn
        .query_row(
            "SELECT Id, DeviceName, RoomName, BackgroundColor, IsDeviceOn
             FROM Devices WHERE DeviceName = ?1 AND RoomName = ?2
             ORDER BY Id LIMIT 1",
            [device_name, room_name],
            device_from_row,
        )
        .optional()?;
    Ok(device)
}

/// List all canonical devices
pub fn list_devices(conn: &Connection) -> DbResult<Vec<Device>> {
    let mut stmt = conn.prepare(
        "SELECT Id, DeviceName, RoomName, BackgroundColor, IsDeviceOn
         FROM Devices ORDER BY Id",
    )?;

    let devices = stmt
        .query_map([], device_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(devices)
}

pub fn delete_device(conn: &Connection, id: i64) -> DbResult<usize> {
    Ok(conn.execute("DELETE FROM Devices WHERE Id = ?1", [id])?)
}

pub fn set_device_power(conn: &Connection, id: i64, is_on: bool) -> DbResult<usize> {
    Ok(conn.execute(
        "UPDATE Devices SET IsDeviceOn = ?1 WHERE Id = ?2",
        params![is_on, id],
    )?)
}

// ==================== MIRROR QUERIES ====================

pub fn insert_mirror_row(conn: &Connection, table: &str, device: &Device) -> DbResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} (DeviceName, BackgroundColor, IsDeviceOn) VALUES (?1, ?2, ?3)",
            quote_ident(table)
        ),
        params![device.device_name, device.background_color, device.is_device_on],
    )?;
    Ok(())
}

pub fn delete_mirror_row(conn: &Connection, table: &str, device_name: &str) -> DbResult<usize> {
    Ok(conn.execute(
        &format!("DELETE FROM {} WHERE DeviceName = ?1", quote_ident(table)),
        [device_name],
    )?)
}

pub fn set_mirror_power(
    conn: &Connection,
    table: &str,
    device_name: &str,
    is_on: bool,
) -> DbResult<usize> {
    Ok(conn.execute(
        &format!(
            "UPDATE {} SET IsDeviceOn = ?1 WHERE DeviceName = ?2",
            quote_ident(table)
        ),
        params![is_on, device_name],
    )?)
}

/// All rows of one room's mirror table
pub fn list_room_devices(conn: &Connection, table: &str) -> DbResult<Vec<RoomDevice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT Id, DeviceName, BackgroundColor, IsDeviceOn FROM {} ORDER BY Id",
        quote_ident(table)
    ))?;

    let devices = stmt
        .query_map([], room_device_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(devices)
}

/// Every distinct room in Devices with the contents of its mirror table.
///
/// A room whose mirror table has not been synced yet is listed empty.
pub fn list_rooms(conn: &Connection) -> DbResult<Vec<Room>> {
    let mut rooms = Vec::new();
    for room_name in distinct_room_names(conn)? {
        let devices = match room_table(conn, &room_name)? {
            Some(table) => list_room_devices(conn, &table)?,
            None => Vec::new(),
        };
        rooms.push(Room { room_name, devices });
    }
    Ok(rooms)
}

// ==================== LOG QUERIES ====================

/// Append an entry to the action log
pub fn append_log(conn: &Connection, device_id: i64, action: DeviceAction) -> DbResult<i64> {
    conn.execute(
        "INSERT INTO DeviceLogs (DeviceId, Action) VALUES (?1, ?2)",
        params![device_id, action.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// List the action log, most recent first
pub fn list_device_logs(conn: &Connection) -> DbResult<Vec<DeviceLog>> {
    let mut stmt = conn.prepare(
        "SELECT Id, DeviceId, Action, Timestamp
         FROM DeviceLogs
         ORDER BY Timestamp DESC, Id DESC",
    )?;

    let logs = stmt
        .query_map([], log_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(logs)
}
