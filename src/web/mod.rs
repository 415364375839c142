//! HTTP surface for the backup service.
//!
//! Thin handlers: each one calls a single [`BackupService`] operation and
//! maps the result onto a JSON body. Errors always render as
//! `{error, message, technical?}`.

use crate::backup::{BackupError, BackupWarning, RestoreInput, format_size};
use crate::facade::BackupService;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<String>,
}

#[derive(Debug)]
pub struct WebError(pub BackupError);

impl From<BackupError> for WebError {
    fn from(err: BackupError) -> Self {
        WebError(err)
    }
}

impl WebError {
    /// Map a body that never reached the engine. `body_limit` is the limit
    /// the router enforces; the body's real size is not known here.
    fn rejected(rejection: JsonRejection, body_limit: usize) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return WebError(BackupError::PayloadTooLarge {
                size: None,
                limit: body_limit,
            });
        }
        WebError(BackupError::InvalidFormat(rejection.body_text()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BackupError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            BackupError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            BackupError::NotFound => StatusCode::NOT_FOUND,
            BackupError::OperationInProgress => StatusCode::CONFLICT,
            BackupError::ConstraintViolation { .. } => StatusCode::CONFLICT,
            BackupError::SchemaMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BackupError::TransactionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BackupError::ConnectivityFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "backup request failed");
        }
        let body = Json(ErrorResponse {
            error: self.0.category(),
            message: self.0.user_message(),
            technical: self.0.technical(),
        });
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[derive(Debug, Serialize)]
pub struct CreateSummary {
    pub tables: usize,
    pub records: usize,
    pub size: String,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub summary: CreateSummary,
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub backup: RestoreInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub tables_restored: usize,
    pub rows_restored: usize,
    pub rows_skipped: usize,
    pub warnings: Vec<BackupWarning>,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub summary: RestoreOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub success: bool,
    pub records_cleared: usize,
    pub tables_cleared: usize,
    pub timestamp: DateTime<Utc>,
    pub warnings: Vec<BackupWarning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn router(service: Arc<BackupService>) -> Router {
    let body_limit = service.config().body_limit();
    Router::new()
        .route("/api/backup/create", post(create_backup))
        .route("/api/backup/download", get(download_backup))
        .route("/api/backup/restore", post(restore_backup))
        .route("/api/backup/clear", post(clear_all))
        .route("/api/backup/status", get(backup_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn create_backup(State(service): State<Arc<BackupService>>) -> Result<Json<CreateResponse>> {
    let summary = service.create_snapshot().await?;
    Ok(Json(CreateResponse {
        success: true,
        timestamp: summary.created_at,
        summary: CreateSummary {
            tables: summary.table_count,
            records: summary.record_count,
            size: format_size(summary.approximate_byte_size),
        },
    }))
}

async fn download_backup(State(service): State<Arc<BackupService>>) -> Result<Response> {
    let download = service.download_snapshot()?;
    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.body,
    )
        .into_response())
}

async fn restore_backup(
    State(service): State<Arc<BackupService>>,
    payload: std::result::Result<Json<RestoreRequest>, JsonRejection>,
) -> Result<Json<RestoreResponse>> {
    let Json(request) =
        payload.map_err(|rejection| WebError::rejected(rejection, service.config().body_limit()))?;
    let summary = service.restore(request.backup).await?;
    let message = if summary.rows_skipped == 0 {
        format!("Restored {} records.", summary.rows_restored)
    } else {
        format!(
            "Restored {} records; {} could not be restored.",
            summary.rows_restored, summary.rows_skipped
        )
    };
    Ok(Json(RestoreResponse {
        success: true,
        message,
        timestamp: Utc::now(),
        summary: RestoreOutcome {
            tables_restored: summary.tables_restored,
            rows_restored: summary.rows_restored,
            rows_skipped: summary.rows_skipped,
            warnings: summary.warnings,
        },
    }))
}

async fn clear_all(State(service): State<Arc<BackupService>>) -> Result<Json<ClearResponse>> {
    let summary = service.clear_all().await?;
    Ok(Json(ClearResponse {
        success: true,
        records_cleared: summary.rows_cleared,
        tables_cleared: summary.tables_cleared,
        timestamp: Utc::now(),
        warnings: summary.warnings,
    }))
}

async fn backup_status(State(service): State<Arc<BackupService>>) -> Json<StatusResponse> {
    let status = service.snapshot_status();
    Json(StatusResponse {
        available: status.is_some(),
        size: status.map(|s| format_size(s.size)),
        created_at: status.map(|s| s.created_at),
    })
}
