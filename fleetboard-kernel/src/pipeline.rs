/**
 * INGESTION PIPELINE - Traitement d'un rapport agent
 *
 * RÔLE : Orchestration d'un rapport entrant : classification du risque
 * (dégradée à 0.0 si le modèle est absent ou en faute), bucket de statut,
 * puis upsert registry + append historique en une transaction sous le verrou
 * du store. Ne fait jamais échouer la requête de l'agent.
 */

use std::sync::Arc;

use crate::classifier::{Classification, FeatureVector, RiskClassifier};
use crate::models::{DeviceSnapshot, DeviceStatus, HistoryEntry, ReportIn};
use crate::state::{unix_now, Shared};
use crate::store::TelemetryStore;

pub struct IngestionPipeline {
    store: Shared<TelemetryStore>,
    classifier: Arc<RiskClassifier>,
}

impl IngestionPipeline {
    pub fn new(store: Shared<TelemetryStore>, classifier: Arc<RiskClassifier>) -> Self {
        Self { store, classifier }
    }

    /// Ingestion d'un rapport : retourne le risque calculé.
    pub fn ingest(&self, report: &ReportIn) -> f64 {
        let features: FeatureVector = [
            report.cpu_usage,
            report.memory_usage,
            report.disk_usage,
            report.net_io,
            report.cpu_mean_5,
            report.cpu_std_5,
            report.mem_mean_5,
            report.net_rate,
        ];

        let failure_risk = match self.classifier.classify(&features) {
            Classification::Scored(p) => p,
            Classification::Unavailable => 0.0,
            Classification::Faulted(e) => {
                eprintln!("[ingest] prediction failed for {}: {e}", report.device_id);
                0.0
            }
        };

        // un seul `now` pour le snapshot et l'entrée d'historique
        let now = unix_now();
        let snapshot = DeviceSnapshot {
            device_id: report.device_id.clone(),
            name: report.device_id.clone(),
            cpu_usage: report.cpu_usage,
            memory_usage: report.memory_usage,
            disk_usage: report.disk_usage,
            net_io: report.net_io,
            failure_risk,
            status: DeviceStatus::from_risk(failure_risk),
            last_seen: now,
        };
        let entry = HistoryEntry {
            timestamp: now as i64,
            cpu_usage: report.cpu_usage,
            memory_usage: report.memory_usage,
            failure_probability: failure_risk,
        };

        self.store.lock().record(snapshot, entry);
        failure_risk
    }
}
