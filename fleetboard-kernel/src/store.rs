/**
 * TELEMETRY STORE - État courant + historique borné de la fleet
 *
 * RÔLE : Registry des snapshots par device et ring buffers d'historique,
 * sous un seul verrou pour que la paire upsert+append soit transactionnelle.
 *
 * ARCHITECTURE : HashMap<device_id, snapshot> + HashMap<device_id, VecDeque>
 * bornée à `history_limit` (8640 ≈ 24h @ 10s). Création paresseuse au premier
 * rapport, durée de vie = process.
 */

use std::collections::{HashMap, VecDeque};

use crate::models::{DeviceSnapshot, DevicesMap, HistoryEntry};

pub struct TelemetryStore {
    devices: DevicesMap,
    history: HashMap<String, VecDeque<HistoryEntry>>,
    history_limit: usize,
}

impl TelemetryStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            devices: HashMap::new(),
            history: HashMap::new(),
            history_limit,
        }
    }

    /// Upsert du snapshot + append d'historique sous le même verrou appelant :
    /// un lecteur ne voit jamais l'un sans l'autre. Buffer plein → éviction du
    /// plus ancien avant insertion.
    pub fn record(&mut self, snapshot: DeviceSnapshot, entry: HistoryEntry) {
        let buf = self.history.entry(snapshot.device_id.clone()).or_default();
        if buf.len() >= self.history_limit {
            buf.pop_front();
        }
        buf.push_back(entry);
        self.devices.insert(snapshot.device_id.clone(), snapshot);
    }

    /// Absent = résultat vide, pas une erreur.
    pub fn get(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        self.devices.get(device_id)
    }

    /// Historique du plus ancien au plus récent ; vide pour un device inconnu.
    pub fn history(&self, device_id: &str) -> Vec<HistoryEntry> {
        self.history
            .get(device_id)
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Devices vus strictement dans la fenêtre : `now - last_seen < window`.
    /// Un device silencieux depuis exactement 15s sort de la vue active.
    pub fn list_active(&self, now: f64, window_seconds: f64) -> Vec<DeviceSnapshot> {
        self.devices
            .values()
            .filter(|d| now - d.last_seen < window_seconds)
            .cloned()
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn active_count(&self, now: f64, window_seconds: f64) -> usize {
        self.devices
            .values()
            .filter(|d| now - d.last_seen < window_seconds)
            .count()
    }

    pub fn history_entry_count(&self) -> usize {
        self.history.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceStatus;

    fn snapshot(device_id: &str, last_seen: f64) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: device_id.to_string(),
            name: device_id.to_string(),
            cpu_usage: 42.0,
            memory_usage: 50.0,
            disk_usage: 30.0,
            net_io: 120.0,
            failure_risk: 0.1,
            status: DeviceStatus::Healthy,
            last_seen,
        }
    }

    fn entry(timestamp: i64) -> HistoryEntry {
        HistoryEntry {
            timestamp,
            cpu_usage: 42.0,
            memory_usage: 50.0,
            failure_probability: 0.1,
        }
    }

    #[test]
    fn test_history_clamped_to_limit_fifo() {
        let mut store = TelemetryStore::new(8640);
        for i in 0..8645 {
            store.record(snapshot("d1", i as f64), entry(i));
        }
        let history = store.history("d1");
        assert_eq!(history.len(), 8640);
        // les 5 plus anciennes évincées, le reste dans l'ordre d'insertion
        assert_eq!(history.first().unwrap().timestamp, 5);
        assert_eq!(history.last().unwrap().timestamp, 8644);
    }

    #[test]
    fn test_history_unknown_device_is_empty() {
        let store = TelemetryStore::new(8640);
        assert!(store.history("ghost").is_empty());
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn test_record_replaces_snapshot() {
        let mut store = TelemetryStore::new(8);
        store.record(snapshot("d1", 100.0), entry(100));
        store.record(snapshot("d1", 200.0), entry(200));
        assert_eq!(store.device_count(), 1);
        assert_eq!(store.get("d1").unwrap().last_seen, 200.0);
        assert_eq!(store.history("d1").len(), 2);
    }

    #[test]
    fn test_active_window_strict_boundary() {
        let mut store = TelemetryStore::new(8);
        let now = 1000.0;
        store.record(snapshot("on-edge", now - 15.0), entry(985));
        store.record(snapshot("just-in", now - 14.999), entry(985));
        store.record(snapshot("fresh", now), entry(1000));

        let active = store.list_active(now, 15.0);
        let ids: Vec<&str> = active.iter().map(|d| d.device_id.as_str()).collect();
        assert!(!ids.contains(&"on-edge"));
        assert!(ids.contains(&"just-in"));
        assert!(ids.contains(&"fresh"));
        assert_eq!(store.active_count(now, 15.0), 2);
    }

    #[test]
    fn test_independent_buffers_per_device() {
        let mut store = TelemetryStore::new(2);
        store.record(snapshot("a", 1.0), entry(1));
        store.record(snapshot("a", 2.0), entry(2));
        store.record(snapshot("a", 3.0), entry(3));
        store.record(snapshot("b", 1.0), entry(1));

        assert_eq!(store.history("a").len(), 2);
        assert_eq!(store.history("a")[0].timestamp, 2);
        assert_eq!(store.history("b").len(), 1);
        assert_eq!(store.history_entry_count(), 3);
    }
}
