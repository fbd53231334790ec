//! HTTP API server for the backup dashboard

use crate::dashboard::{BackupFilter, DashboardReader, ExportFormat};
use crate::types::{BackupEntry, BackupStats};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Default lookback for the abandoned and failed listings
const DEFAULT_HOURS_BACK: i64 = 24;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API server state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<DashboardReader>,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    dashboard: Arc<DashboardReader>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, dashboard: Arc<DashboardReader>) -> Self {
        Self { config, dashboard }
    }

    /// Serve until ctrl-c
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = build_router(AppState {
            dashboard: self.dashboard.clone(),
        });

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down API server");
            })
            .await?;
        Ok(())
    }
}

/// Build router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/backups", get(list_backups_handler).post(receive_backup_handler))
        .route("/backups/stats", get(stats_handler))
        .route("/backups/abandoned", get(abandoned_handler))
        .route("/backups/failed", get(failed_handler))
        .route("/backups/export", get(export_handler))
        // Health check
        .route("/health", get(health_handler))
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn list_backups_handler(
    State(state): State<AppState>,
    Query(filter): Query<BackupFilter>,
) -> Json<Vec<BackupEntry>> {
    Json(state.dashboard.filter(&filter))
}

#[derive(Debug, Serialize)]
struct ReceiveResponse {
    stored: usize,
}

async fn receive_backup_handler(
    State(state): State<AppState>,
    Json(entry): Json<BackupEntry>,
) -> Response {
    match state.dashboard.receive_backup_data(entry) {
        Ok(stored) => (StatusCode::ACCEPTED, Json(ReceiveResponse { stored })).into_response(),
        Err(e) => {
            debug!("Rejected pushed entry: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn stats_handler(State(state): State<AppState>) -> Json<BackupStats> {
    Json(state.dashboard.get_backup_stats())
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    hours: Option<i64>,
}

impl WindowQuery {
    fn hours(&self) -> i64 {
        self.hours.unwrap_or(DEFAULT_HOURS_BACK).max(0)
    }
}

async fn abandoned_handler(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Json<Vec<BackupEntry>> {
    Json(state.dashboard.get_abandoned_forms(query.hours()))
}

async fn failed_handler(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Json<Vec<BackupEntry>> {
    Json(state.dashboard.get_failed_submissions(query.hours()))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<String>,
    form_id: Option<String>,
}

async fn export_handler(State(state): State<AppState>, Query(query): Query<ExportQuery>) -> Response {
    let format = match query.format.as_deref().unwrap_or("json").parse::<ExportFormat>() {
        Ok(format) => format,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state
        .dashboard
        .export_backup_data(query.form_id.as_deref(), format)
    {
        Ok(body) => {
            let disposition = format!(
                "attachment; filename=\"form-backups.{}\"",
                format.extension()
            );
            (
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    entries: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        entries: state.dashboard.get_backup_stats().total,
    })
}
