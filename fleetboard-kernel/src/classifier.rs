/**
 * RISK CLASSIFIER - Capacité externe de prédiction de panne
 *
 * RÔLE : Adapter le modèle entraîné hors-process (export JSON poids+biais)
 * en capacité `classify(features) -> probabilité [0,1]`.
 *
 * FONCTIONNEMENT : Résultat taggé Scored/Unavailable/Faulted ; le pipeline
 * d'ingestion dégrade tout non-Scored à 0.0, l'ingestion ne plante jamais
 * à cause du modèle (comportement au boot : warning + démarrage sans modèle).
 */

use anyhow::{Context, Result};
use serde::Deserialize;

pub const FEATURE_COUNT: usize = 8;

/// Vecteur de features dans l'ordre du contrat /send_metrics :
/// cpu_usage, memory_usage, disk_usage, net_io, cpu_mean_5, cpu_std_5,
/// mem_mean_5, net_rate.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Seam de test : tout modèle scoring un vecteur de features.
pub trait RiskModel: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64>;
}

/// Modèle logistique exporté par le pipeline d'entraînement (hors scope ici).
#[derive(Debug, Deserialize)]
pub struct LogisticModel {
    pub weights: [f64; FEATURE_COUNT],
    pub bias: f64,
}

impl RiskModel for LogisticModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        let z: f64 = self
            .weights
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        let p = 1.0 / (1.0 + (-z).exp());
        if !p.is_finite() {
            anyhow::bail!("non-finite probability (z = {z})");
        }
        Ok(p)
    }
}

/// Issue d'une classification, mappée explicitement par le pipeline.
pub enum Classification {
    Scored(f64),
    Unavailable,
    Faulted(anyhow::Error),
}

pub struct RiskClassifier {
    model: Option<Box<dyn RiskModel>>,
}

impl RiskClassifier {
    pub fn disabled() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: Box<dyn RiskModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Charge le modèle depuis le fichier JSON ; en cas d'échec le kernel
    /// démarre quand même, le risque vaudra 0.
    pub fn load(path: &str) -> Self {
        match Self::try_load(path) {
            Ok(classifier) => {
                println!("[classifier] model loaded from {path}");
                classifier
            }
            Err(e) => {
                eprintln!("[classifier] could not load model from {path}: {e} - failure probability will be 0");
                Self::disabled()
            }
        }
    }

    fn try_load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("read model file {path}"))?;
        let model: LogisticModel =
            serde_json::from_str(&content).context("parse model file")?;
        Ok(Self::with_model(Box::new(model)))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify(&self, features: &FeatureVector) -> Classification {
        match &self.model {
            None => Classification::Unavailable,
            Some(model) => match model.predict_proba(features) {
                Ok(p) => Classification::Scored(p.clamp(0.0, 1.0)),
                Err(e) => Classification::Faulted(e),
            },
        }
    }
}
