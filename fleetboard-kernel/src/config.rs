use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KernelConfig {
    pub listen_port: u16,
    pub upload_dir: String,
    pub model_path: String,
    pub history_limit: usize,
    pub active_window_seconds: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            listen_port: 8000,
            upload_dir: "file_uploads".into(),
            model_path: "models/failure_model.json".into(),
            history_limit: 8640, // ≈ 24h @ un rapport / 10s
            active_window_seconds: 15.0,
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("FLEETBOARD_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return KernelConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[kernel] config invalide: {e}");
            KernelConfig::default()
        })
    } else {
        eprintln!("[kernel] pas de kernel.yaml, usage config par défaut");
        KernelConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.listen_port, 8000);
        assert_eq!(cfg.history_limit, 8640);
        assert_eq!(cfg.active_window_seconds, 15.0);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let cfg: KernelConfig = serde_yaml::from_str("listen_port: 9100\n").unwrap();
        assert_eq!(cfg.listen_port, 9100);
        assert_eq!(cfg.upload_dir, "file_uploads");
        assert_eq!(cfg.history_limit, 8640);
    }
}
