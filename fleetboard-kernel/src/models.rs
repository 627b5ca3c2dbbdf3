use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rapport de métriques envoyé par un agent (contrat /send_metrics).
/// Les 8 features partent telles quelles au classifieur ; aucune validation
/// numérique (NaN, valeurs négatives passent).
#[derive(Debug, Clone, Deserialize)]
pub struct ReportIn {
    pub device_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub net_io: f64,
    pub cpu_mean_5: f64,
    pub cpu_std_5: f64,
    pub mem_mean_5: f64,
    pub net_rate: f64,
}

/// Bucket de statut dérivé du risque de panne continu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Healthy,
    Warning,
    Critical,
}

impl DeviceStatus {
    /// Seuils fixes, fermés sur la borne basse : 0.5 → Warning, 0.9 → Critical.
    pub fn from_risk(risk: f64) -> Self {
        if risk >= 0.9 {
            DeviceStatus::Critical
        } else if risk >= 0.5 {
            DeviceStatus::Warning
        } else {
            DeviceStatus::Healthy
        }
    }
}

/// Dernier état connu d'un device, écrasé à chaque rapport (last-write-wins).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub name: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub net_io: f64,
    pub failure_risk: f64,
    pub status: DeviceStatus,
    pub last_seen: f64, // secondes unix fractionnaires
}

/// Entrée d'historique, timestamp tronqué à la seconde, ordre = ordre d'arrivée.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub failure_probability: f64,
}

pub type DevicesMap = HashMap<String, DeviceSnapshot>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_thresholds() {
        assert_eq!(DeviceStatus::from_risk(0.0), DeviceStatus::Healthy);
        assert_eq!(DeviceStatus::from_risk(0.4999), DeviceStatus::Healthy);
        assert_eq!(DeviceStatus::from_risk(0.5), DeviceStatus::Warning);
        assert_eq!(DeviceStatus::from_risk(0.8999), DeviceStatus::Warning);
        assert_eq!(DeviceStatus::from_risk(0.9), DeviceStatus::Critical);
        assert_eq!(DeviceStatus::from_risk(1.0), DeviceStatus::Critical);
    }

    #[test]
    fn test_status_serializes_as_string() {
        let json = serde_json::to_string(&DeviceStatus::Warning).unwrap();
        assert_eq!(json, "\"Warning\"");
    }
}
