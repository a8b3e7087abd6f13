pub mod browse;
pub mod config;
pub mod settings;
pub mod tokens;

use std::sync::Arc;

use gizmo_core::{Config, Event, IncentiveService, IncentiveSnapshot, SqliteStore, SystemClock};
use serde::Serialize;

/// What every state-changing command prints.
#[derive(Serialize)]
pub struct CommandOutput {
    pub events: Vec<Event>,
    pub state: IncentiveSnapshot,
}

/// Open the SQLite store named by the config and load the incentive state.
pub async fn open_service(
    config: &Config,
) -> Result<Arc<IncentiveService>, Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&config.database_path()?)?;
    let service = IncentiveService::load(
        Arc::new(store),
        Arc::new(SystemClock),
        config.persistence.clone(),
    )
    .await;
    Ok(Arc::new(service))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Flush pending writes, then print the events with the resulting state.
pub async fn finish(
    service: &IncentiveService,
    events: Vec<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    service.flush().await;
    print_json(&CommandOutput {
        events,
        state: service.snapshot(),
    })
}
