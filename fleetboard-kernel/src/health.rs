use serde::Serialize;
use std::time::Instant;

use crate::files::FileDistributor;
use crate::state::{unix_now, Shared};
use crate::store::TelemetryStore;

#[derive(Debug, Serialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub devices_tracked: u32,
    pub active_devices: u32,
    pub history_entries: u64,
    pub pending_files: u32,
    pub model_status: String,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    model_loaded: bool,
}

impl HealthTracker {
    pub fn new(model_loaded: bool) -> Self {
        Self {
            start_time: Instant::now(),
            model_loaded,
        }
    }

    pub fn get_health(
        &self,
        store: &Shared<TelemetryStore>,
        files: &FileDistributor,
        active_window_seconds: f64,
    ) -> KernelHealth {
        let now = unix_now();
        let (devices_tracked, active_devices, history_entries) = {
            let map = store.lock();
            (
                map.device_count() as u32,
                map.active_count(now, active_window_seconds) as u32,
                map.history_entry_count() as u64,
            )
        };

        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            devices_tracked,
            active_devices,
            history_entries,
            pending_files: files.pending_count() as u32,
            model_status: if self.model_loaded { "loaded" } else { "unavailable" }.to_string(),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        let pid = std::process::id();
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", pid)) {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    if let Some(kb) = line
                        .split_whitespace()
                        .nth(1)
                        .and_then(|v| v.parse::<u64>().ok())
                    {
                        return (kb as f32) / 1024.0; // KB -> MB
                    }
                }
            }
        }
    }

    // Fallback approximatif
    12.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceSnapshot, DeviceStatus, HistoryEntry};
    use crate::state::new_state;

    #[test]
    fn test_health_counts() {
        let store = new_state(TelemetryStore::new(8640));
        let files = FileDistributor::new(std::env::temp_dir().join("fleetboard-health-test"));

        let now = unix_now();
        store.lock().record(
            DeviceSnapshot {
                device_id: "d1".into(),
                name: "d1".into(),
                cpu_usage: 10.0,
                memory_usage: 20.0,
                disk_usage: 30.0,
                net_io: 40.0,
                failure_risk: 0.1,
                status: DeviceStatus::Healthy,
                last_seen: now,
            },
            HistoryEntry {
                timestamp: now as i64,
                cpu_usage: 10.0,
                memory_usage: 20.0,
                failure_probability: 0.1,
            },
        );

        let tracker = HealthTracker::new(false);
        let health = tracker.get_health(&store, &files, 15.0);
        assert_eq!(health.devices_tracked, 1);
        assert_eq!(health.active_devices, 1);
        assert_eq!(health.history_entries, 1);
        assert_eq!(health.pending_files, 0);
        assert_eq!(health.model_status, "unavailable");
    }
}
