// Smart Home - local device manager
// Module declarations

pub mod commands;
pub mod config;
pub mod state;

use config::Config;
use state::DeviceStore;

/// Process startup: bootstrap the database, sync room tables and print the
/// initial snapshot as JSON for the presentation layer.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = Config::from_env().map_err(|e| {
        log::error!("Failed to resolve configuration: {}", e);
        e
    })?;

    let store = DeviceStore::open(&config.db_path).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        e
    })?;

    let snapshot = store.snapshot();
    log::info!(
        "Smart Home initialized: {} devices in {} rooms, {} log entries",
        snapshot.devices.len(),
        snapshot.rooms.len(),
        snapshot.logs.len()
    );

    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}
