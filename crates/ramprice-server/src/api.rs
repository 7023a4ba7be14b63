use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ramprice::history::HistoryKeyMode;
use ramprice::ingest::{IngestStatus, UpdateRequest, ingest_text};
use ramprice::report::RamReport;
use ramprice::store::{JsonFileStore, PriceStore};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

#[derive(Debug, Clone)]
pub struct ApiServer {
    store: JsonFileStore,
    key_mode: HistoryKeyMode,
    // One read-modify-write cycle at a time per process.
    write_lock: Arc<Mutex<()>>,
}

impl ApiServer {
    pub fn new(store_path: impl Into<PathBuf>, key_mode: HistoryKeyMode) -> Self {
        Self {
            store: JsonFileStore::new(store_path),
            key_mode,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn ram_data(&self) -> RamReport {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || RamReport::from_store(&store.load()))
            .await
            .unwrap_or_else(|e| {
                log::error!("Load task failed: {e:?}");
                RamReport::from_store(&PriceStore::default())
            })
    }

    pub async fn update(&self, request: UpdateRequest) -> IngestStatus {
        let key = match self.key_mode.manual_key(&request.date, &request.time) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Rejected update: {e}");
                return IngestStatus::error(e.to_string());
            }
        };

        let _guard = self.write_lock.lock().await;
        let store = self.store.clone();
        let result =
            tokio::task::spawn_blocking(move || ingest_text(&store, &request.text, &key)).await;

        match result {
            Ok(Ok(outcome)) => IngestStatus::from(outcome),
            Ok(Err(e)) => {
                log::error!("Failed to save store: {e:?}");
                IngestStatus::error(format!("Failed to save store: {e}"))
            }
            Err(e) => {
                log::error!("Ingest task failed: {e:?}");
                IngestStatus::error("Ingest task failed")
            }
        }
    }

    pub async fn download(&self) -> io::Result<String> {
        tokio::fs::read_to_string(self.store.path()).await
    }
}

pub fn router(server: ApiServer) -> Router {
    Router::new()
        .route("/api/ram-data", get(ram_data))
        .route("/api/admin/update", post(update))
        .route("/api/admin/download", get(download))
        .layer(CorsLayer::permissive())
        .with_state(server)
}

async fn ram_data(State(server): State<ApiServer>) -> Json<RamReport> {
    Json(server.ram_data().await)
}

async fn update(
    State(server): State<ApiServer>,
    Json(request): Json<UpdateRequest>,
) -> Json<IngestStatus> {
    Json(server.update(request).await)
}

async fn download(State(server): State<ApiServer>) -> Response {
    match server.download().await {
        Ok(body) => {
            let filename = format!(
                "attachment; filename=\"backup_{}.json\"",
                chrono::Local::now().format("%Y%m%d")
            );
            (
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::CONTENT_DISPOSITION, filename),
                ],
                body,
            )
                .into_response()
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No file" })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to read store for download: {e:?}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
