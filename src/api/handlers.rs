use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::service::DashboardService;

use super::error::ApiError;
use super::types::{HealthResponse, MicrographResponse, ProgressQuery};

const PNG_MIME: &str = "image/png";

pub async fn health(State(service): State<Arc<DashboardService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        micrographs: service.micrograph_count().await,
    })
}

/// Latest published view, or 204 when the client is already at it.
pub async fn progress(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    match service.view().await {
        Some(view) if query.since != Some(view.generation) => Json(view).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn micrograph(
    State(service): State<Arc<DashboardService>>,
    Path(index): Path<usize>,
) -> Result<Json<MicrographResponse>, ApiError> {
    let row = service.select(index).await?;
    Ok(Json(MicrographResponse { index, row }))
}

pub async fn preview(
    State(service): State<Arc<DashboardService>>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    if file.contains(['/', '\\']) || file.contains("..") {
        return Err(ApiError::InvalidRequest(format!(
            "invalid preview name '{file}'"
        )));
    }
    if !file.ends_with(".png") {
        return Err(ApiError::NotFound(format!("preview '{file}' not found")));
    }
    let dir = service
        .previews_dir()
        .await
        .ok_or_else(|| ApiError::NotFound("no micrographs loaded yet".to_string()))?;

    let bytes = match tokio::fs::read(dir.join(&file)).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("preview '{file}' not found")));
        }
        Err(e) => return Err(ApiError::Internal(format!("reading preview '{file}': {e}"))),
    };
    Ok(([(header::CONTENT_TYPE, PNG_MIME)], bytes).into_response())
}
