// Commands exposed to the presentation layer
//
// Each mutating command runs on the blocking pool and answers with the fresh
// snapshot, so a UI can redraw from the returned value alone.
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Config;
use crate::state::{
    CreateDeviceRequest, DbResult, DeleteDeviceRequest, DeviceStore, Snapshot,
};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Shared handle to the device store
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<DeviceStore>>,
}

impl AppState {
    pub fn new(store: DeviceStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn open(config: &Config) -> DbResult<Self> {
        Ok(Self::new(DeviceStore::open(&config.db_path)?))
    }
}

/// Run `op` against the store off the async executor, logging any failure
async fn with_store<T, F>(state: &AppState, action: &'static str, op: F) -> CommandResult<T>
where
    F: FnOnce(&mut DeviceStore) -> DbResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    let joined = tokio::task::spawn_blocking(move || {
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut store)
    })
    .await;

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            log::error!("Failed to {}: {}", action, e);
            Err(CommandError::from(e))
        }
        Err(e) => {
            log::error!("Failed to {}: {}", action, e);
            Err(CommandError::from(e))
        }
    }
}

// ==================== DEVICE COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct CreateDeviceInput {
    pub name: String,
    pub room: String,
    pub color: String,
}

/// Add a device. Incomplete input is ignored and the unchanged snapshot returned.
pub async fn create_device(state: &AppState, input: CreateDeviceInput) -> CommandResult<Snapshot> {
    let request = CreateDeviceRequest {
        device_name: input.name,
        room_name: input.room,
        background_color: input.color,
    };

    with_store(state, "create device", move |store| {
        store.create_device(request)?;
        Ok(store.snapshot().clone())
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct DeleteDeviceInput {
    pub name: String,
    pub room: String,
}

/// Delete a device by name and room. Unknown devices are ignored.
pub async fn delete_device(state: &AppState, input: DeleteDeviceInput) -> CommandResult<Snapshot> {
    let request = DeleteDeviceRequest {
        device_name: input.name,
        room_name: input.room,
    };

    with_store(state, "delete device", move |store| {
        store.delete_device(request)?;
        Ok(store.snapshot().clone())
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct ToggleDeviceInput {
    pub device_id: i64,
}

pub async fn toggle_device(state: &AppState, input: ToggleDeviceInput) -> CommandResult<Snapshot> {
    with_store(state, "toggle device", move |store| {
        store.toggle_device(input.device_id)?;
        Ok(store.snapshot().clone())
    })
    .await
}

/// Latest snapshot without touching the database
pub async fn get_snapshot(state: &AppState) -> CommandResult<Snapshot> {
    with_store(state, "read snapshot", |store| Ok(store.snapshot().clone())).await
}

/// Reload the snapshot from the database
pub async fn refresh_snapshot(state: &AppState) -> CommandResult<Snapshot> {
    with_store(state, "refresh snapshot", |store| {
        store.refresh()?;
        Ok(store.snapshot().clone())
    })
    .await
}
