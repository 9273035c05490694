// State management module
// Handles SQLite persistence of devices, room mirrors and the action log

pub mod db;
pub mod models;
pub mod queries;
pub mod rooms;
pub mod storage;
pub mod store;

pub use db::{init_db, DbConnection, DbError, DbResult};
pub use models::{
    CreateDeviceRequest, DeleteDeviceRequest, Device, DeviceAction, DeviceLog, Room, RoomDevice,
    Snapshot,
};
pub use rooms::{sync_room_tables, SyncReport};
pub use storage::StorageError;
pub use store::DeviceStore;
