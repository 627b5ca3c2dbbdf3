/**
 * FLEETBOARD KERNEL - Point d'entrée du serveur de télémétrie
 *
 * RÔLE : Bootstrap : config, modèle de risque (dégradé si absent), store
 * télémétrie, distributeur de fichiers, puis serveur HTTP.
 *
 * ARCHITECTURE : Agents → /send_metrics → pipeline d'ingestion → store
 * partagé → dashboard. Canal fichiers indépendant, best-effort.
 */

mod classifier;
mod config;
mod files;
mod health;
mod http;
mod models;
mod pipeline;
mod state;
mod store;

use crate::classifier::RiskClassifier;
use crate::files::FileDistributor;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::pipeline::IngestionPipeline;
use crate::state::new_state;
use crate::store::TelemetryStore;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    let cfg = config::load_config().await;

    // capacité de classification : le kernel démarre même sans modèle
    let classifier = Arc::new(RiskClassifier::load(&cfg.model_path));
    let health = HealthTracker::new(classifier.is_loaded());

    // store partagé registry + historique, une seule transaction par rapport
    let store = new_state(TelemetryStore::new(cfg.history_limit));
    let pipeline = Arc::new(IngestionPipeline::new(store.clone(), classifier));

    std::fs::create_dir_all(&cfg.upload_dir).unwrap_or_else(|e| {
        eprintln!("[kernel] warning: failed to create upload dir: {e}");
    });
    let files = Arc::new(FileDistributor::new(&cfg.upload_dir));

    let app_state = AppState {
        store,
        pipeline,
        files,
        health,
        active_window_seconds: cfg.active_window_seconds,
    };

    // HTTP
    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    println!("[kernel] listening on http://{addr}");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
