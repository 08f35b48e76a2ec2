use std::time::Duration;

use turn_core::{TurnConfig, TurnConfigSnapshot};

/// Settings for the simulated front desk, on top of the engine's own keys
#[derive(Debug, Clone)]
pub struct DeskSettings {
    pub organization_id: String,
    pub service_id: String,
    pub wait_minutes: u32,
    pub clients: usize,
    pub call_interval: Duration,
    pub log_format: String,
}

impl DeskSettings {
    pub fn from_snapshot(snapshot: &TurnConfigSnapshot) -> Self {
        Self {
            organization_id: snapshot
                .get_string("desk.organization_id")
                .unwrap_or_else(|| "clinic-7".to_string()),
            service_id: snapshot
                .get_string("desk.service_id")
                .unwrap_or_else(|| "consultation".to_string()),
            wait_minutes: snapshot
                .get_u64("desk.wait_minutes")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(10),
            clients: snapshot.get_usize("desk.clients").unwrap_or(6),
            call_interval: Duration::from_millis(snapshot.get_u64("desk.call_interval_ms").unwrap_or(300)),
            log_format: snapshot.get_string("log.format").unwrap_or_default(),
        }
    }
}

/// Defaults first, then anything under `TURNLINE__` in the environment
pub fn load() -> TurnConfig {
    let mut config = TurnConfig::new();
    config.set("queue.max_roster_size", "50");
    config.set("queue.refresh_estimates", "true");

    config.load_env("TURNLINE__");
    config
}
