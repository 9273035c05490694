// Device store: mutations over devices, mirrors and the action log
use std::path::Path;

use super::db::{init_db, DbConnection, DbResult};
use super::models::{
    CreateDeviceRequest, DeleteDeviceRequest, Device, DeviceAction, DeviceLog, Room, Snapshot,
};
use super::queries;
use super::rooms::{self, SyncReport};

/// Owns the database handle and the latest read-side snapshot.
///
/// Each mutation writes the canonical row, its room mirror and a log entry in
/// one transaction, then reloads the whole snapshot from the database. If any
/// step fails the error is returned and the previous snapshot is kept.
pub struct DeviceStore {
    db: DbConnection,
    snapshot: Snapshot,
}

impl DeviceStore {
    /// Bootstrap the database at `path` and load the initial snapshot
    pub fn open(path: &Path) -> DbResult<Self> {
        let db = init_db(path)?;
        Self::with_connection(db)
    }

    /// Use an already bootstrapped database
    pub fn with_connection(db: DbConnection) -> DbResult<Self> {
        let mut store = Self {
            db,
            snapshot: Snapshot::default(),
        };
        store.ensure_room_tables()?;
        store.refresh()?;
        Ok(store)
    }

    pub fn connection(&self) -> &DbConnection {
        &self.db
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Create a device switched off.
    ///
    /// Returns `Ok(None)` without writing anything when a field is empty or
    /// the room already holds a device with that name.
    pub fn create_device(&mut self, request: CreateDeviceRequest) -> DbResult<Option<Device>> {
        if !request.is_complete() {
            log::warn!("Ignoring create request with empty fields: {:?}", request);
            return Ok(None);
        }

        let device = {
            let mut conn = self.db.open()?;
            let tx = conn.transaction()?;

            if queries::find_device(&tx, &request.device_name, &request.room_name)?.is_some() {
                log::warn!(
                    "Ignoring create request: {:?} already exists in {:?}",
                    request.device_name,
                    request.room_name
                );
                return Ok(None);
            }

            let device = queries::insert_device(&tx, &request)?;
            let table = rooms::ensure_room_table(&tx, &device.room_name)?;
            queries::insert_mirror_row(&tx, &table, &device)?;
            queries::append_log(&tx, device.id, DeviceAction::Added)?;
            tx.commit()?;
            device
        };

        log::info!(
            "Added device {} ({:?} in {:?})",
            device.id,
            device.device_name,
            device.room_name
        );

        self.ensure_room_tables()?;
        self.refresh()?;
        Ok(Some(device))
    }

    /// Delete the device matching name and room exactly.
    ///
    /// Log entries referencing the device are kept. Returns `Ok(None)` when no
    /// device matches.
    pub fn delete_device(&mut self, request: DeleteDeviceRequest) -> DbResult<Option<Device>> {
        let device = {
            let mut conn = self.db.open()?;
            let tx = conn.transaction()?;

            let device = match queries::find_device(&tx, &request.device_name, &request.room_name)? {
                Some(device) => device,
                None => {
                    log::warn!(
                        "Ignoring delete request: no {:?} in {:?}",
                        request.device_name,
                        request.room_name
                    );
                    return Ok(None);
                }
            };

            queries::delete_device(&tx, device.id)?;
            if let Some(table) = rooms::room_table(&tx, &device.room_name)? {
                queries::delete_mirror_row(&tx, &table, &device.device_name)?;
            }
            queries::append_log(&tx, device.id, DeviceAction::Deleted)?;
            tx.commit()?;
            device
        };

        log::info!(
            "Deleted device {} ({:?} in {:?})",
            device.id,
            device.device_name,
            device.room_name
        );

        self.refresh()?;
        Ok(Some(device))
    }

    /// Flip the power state of a device in both its canonical and mirror rows.
    ///
    /// Returns the updated device, or `Ok(None)` if the id is unknown.
    pub fn toggle_device(&mut self, device_id: i64) -> DbResult<Option<Device>> {
        let device = {
            let mut conn = self.db.open()?;
            let tx = conn.transaction()?;

            let mut device = match queries::get_device(&tx, device_id)? {
                Some(device) => device,
                None => {
                    log::warn!("Ignoring toggle request for unknown device {}", device_id);
                    return Ok(None);
                }
            };
            device.is_device_on = !device.is_device_on;

            queries::set_device_power(&tx, device.id, device.is_device_on)?;
            match rooms::room_table(&tx, &device.room_name)? {
                Some(table) => {
                    queries::set_mirror_power(&tx, &table, &device.device_name, device.is_device_on)?;
                }
                None => log::warn!("Room {:?} has no mirror table yet", device.room_name),
            }
            queries::append_log(&tx, device.id, DeviceAction::for_power_state(device.is_device_on))?;
            tx.commit()?;
            device
        };

        log::info!("Device {} is now {}", device.id, device.status());

        self.refresh()?;
        Ok(Some(device))
    }

    /// Run room table sync against the current contents of Devices
    pub fn ensure_room_tables(&self) -> DbResult<SyncReport> {
        rooms::sync_room_tables(&self.db)
    }

    pub fn find_device(&self, device_name: &str, room_name: &str) -> DbResult<Option<Device>> {
        let conn = self.db.open()?;
        queries::find_device(&conn, device_name, room_name)
    }

    pub fn load_devices(&self) -> DbResult<Vec<Device>> {
        let conn = self.db.open()?;
        queries::list_devices(&conn)
    }

    pub fn load_device_logs(&self) -> DbResult<Vec<DeviceLog>> {
        let conn = self.db.open()?;
        queries::list_device_logs(&conn)
    }

    pub fn load_rooms(&self) -> DbResult<Vec<Room>> {
        let conn = self.db.open()?;
        queries::list_rooms(&conn)
    }

    /// Reload devices, logs and rooms. The snapshot is replaced only if all
    /// three loads succeed.
    pub fn refresh(&mut self) -> DbResult<&Snapshot> {
        let snapshot = Snapshot {
            devices: self.load_devices()?,
            logs: self.load_device_logs()?,
            rooms: self.load_rooms()?,
        };
        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }
}
