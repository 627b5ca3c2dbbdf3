/**
 * API REST FLEETBOARD - Serveur HTTP du kernel
 *
 * RÔLE :
 * Ce module expose l'API REST consommée par les agents et le dashboard.
 *
 * FONCTIONNEMENT :
 * - Routes agents : /send_metrics, /files/check, /files/download
 * - Routes dashboard : /devices, /device/{id}, /device/{id}/history
 * - Routes opérateur : /files/upload/{device_id}, /files/upload/all (multipart)
 * - Sérialisation JSON automatique des réponses
 * - Erreurs fichiers mappées en {404, 500} + corps {"detail": ...}
 *
 * CONTRATS :
 * - /send_metrics n'échoue jamais côté agent (dégradation interne du risque)
 * - device inconnu sur detail/history = réponse vide, pas une erreur
 * - blob manquant ou broadcast sans destinataire actif = 404
 */

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::files::{FileDistError, FileDistributor};
use crate::health::{HealthTracker, KernelHealth};
use crate::models::{DeviceSnapshot, DeviceStatus, HistoryEntry, ReportIn};
use crate::pipeline::IngestionPipeline;
use crate::state::{unix_now, Shared};
use crate::store::TelemetryStore;

#[derive(serde::Serialize)]
struct DeviceView {
    device_id: String,
    name: String,
    status: DeviceStatus,
    failure_probability: f64,
}

fn to_view(d: &DeviceSnapshot) -> DeviceView {
    DeviceView {
        device_id: d.device_id.clone(),
        name: d.name.clone(),
        status: d.status,
        failure_probability: d.failure_risk,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Shared<TelemetryStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub files: Arc<FileDistributor>,
    pub health: HealthTracker,
    pub active_window_seconds: f64,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/send_metrics", post(send_metrics))
        .route("/devices", get(get_devices))
        .route("/device/{device_id}", get(get_device))
        .route("/device/{device_id}/history", get(get_device_history))
        .route("/files/upload/all", post(upload_to_all))
        .route("/files/upload/{device_id}", post(upload_for_device))
        .route("/files/check/{device_id}", get(check_files))
        .route("/files/download/{device_id}/{filename}", get(download_file))
        .with_state(app_state)
}

// POST /send_metrics (rapport agent, ne refuse jamais le caller)
async fn send_metrics(
    State(app): State<AppState>,
    Json(report): Json<ReportIn>,
) -> Json<Value> {
    let failure_risk = app.pipeline.ingest(&report);
    Json(json!({ "status": "ok", "failure_risk": failure_risk }))
}

// GET /devices (vue active de la fleet)
async fn get_devices(State(app): State<AppState>) -> Json<Vec<DeviceView>> {
    let now = unix_now();
    let list: Vec<DeviceView> = app
        .store
        .lock()
        .list_active(now, app.active_window_seconds)
        .iter()
        .map(to_view)
        .collect();
    Json(list)
}

// GET /device/{id} (détail ; objet vide pour un id inconnu)
async fn get_device(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Value> {
    let map = app.store.lock();
    match map.get(&device_id) {
        Some(snapshot) => Json(serde_json::to_value(snapshot).unwrap_or_else(|_| json!({}))),
        None => Json(json!({})),
    }
}

// GET /device/{id}/history (séquence vide pour un id inconnu)
async fn get_device_history(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Vec<HistoryEntry>> {
    Json(app.store.lock().history(&device_id))
}

// GET /system/health (état du kernel)
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health.get_health(&app.store, &app.files, app.active_window_seconds))
}

// POST /files/upload/{device_id} (multipart, push ciblé)
async fn upload_for_device(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let (filename, bytes) = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return missing_file_response(),
        Err(detail) => return (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))),
    };

    match app.files.push_to_device(&device_id, &filename, &bytes).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("File '{filename}' uploaded for device '{device_id}'")
            })),
        ),
        Err(e) => file_error_response(e),
    }
}

// POST /files/upload/all (multipart, broadcast vers les devices actifs)
async fn upload_to_all(
    State(app): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    // ensemble actif figé à cet instant ; pas de rattrapage des retardataires
    let recipients: Vec<String> = {
        let now = unix_now();
        app.store
            .lock()
            .list_active(now, app.active_window_seconds)
            .into_iter()
            .map(|d| d.device_id)
            .collect()
    };

    let (filename, bytes) = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return missing_file_response(),
        Err(detail) => return (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))),
    };

    match app.files.push_to_active(&filename, &bytes, &recipients).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("File '{filename}' sent to {count} active device(s).")
            })),
        ),
        Err(e) => file_error_response(e),
    }
}

// GET /files/check/{device_id} (hint list des fichiers à récupérer)
async fn check_files(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Value> {
    Json(json!({ "files_to_download": app.files.list_pending(&device_id) }))
}

// GET /files/download/{device_id}/{filename} (consomme la notification)
async fn download_file(
    State(app): State<AppState>,
    Path((device_id, filename)): Path<(String, String)>,
) -> Response {
    match app.files.consume(&device_id, &filename).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => file_error_response(e).into_response(),
    }
}

/// Extrait le premier champ fichier du corps multipart.
async fn read_upload(
    multipart: &mut Multipart,
) -> Result<Option<(String, Vec<u8>)>, String> {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Could not read upload: {e}"))?;
                return Ok(Some((filename, bytes.to_vec())));
            }
            Ok(None) => return Ok(None),
            Err(e) => return Err(format!("Invalid multipart body: {e}")),
        }
    }
}

fn missing_file_response() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": "No file field in upload" })),
    )
}

fn file_error_response(err: FileDistError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        FileDistError::NoActiveRecipients | FileDistError::BlobMissing { .. } => {
            StatusCode::NOT_FOUND
        }
        FileDistError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "detail": err.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_projection() {
        let snapshot = DeviceSnapshot {
            device_id: "pi-07".into(),
            name: "pi-07".into(),
            cpu_usage: 91.0,
            memory_usage: 80.0,
            disk_usage: 60.0,
            net_io: 200.0,
            failure_risk: 0.93,
            status: DeviceStatus::Critical,
            last_seen: 1000.0,
        };
        let view = to_view(&snapshot);
        assert_eq!(view.device_id, "pi-07");
        assert_eq!(view.status, DeviceStatus::Critical);
        assert!((view.failure_probability - 0.93).abs() < 1e-9);
    }

    #[test]
    fn test_file_error_status_mapping() {
        let (status, _) = file_error_response(FileDistError::NoActiveRecipients);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = file_error_response(FileDistError::BlobMissing {
            device_id: "d1".into(),
            filename: "x.bin".into(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = file_error_response(FileDistError::Io(std::io::Error::other("disk")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
