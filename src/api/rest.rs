use axum::extract::{Multipart, Path, State};
use axum::response::Json;
use std::sync::Arc;

use crate::classify::Prediction;
use crate::error::Result;

use super::AppState;
use super::dto::{HealthResponse, InfoResponse};
use super::upload::read_image_upload;

/// Classify an uploaded image
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Prediction>> {
    let upload = read_image_upload(&mut multipart).await?;
    let prediction = state.predict(upload.bytes).await?;
    tracing::info!(
        "API prediction for {:?}: {} ({:.2}%)",
        upload.file_name,
        prediction.label,
        prediction.confidence
    );
    Ok(Json(prediction))
}

/// Descriptive text for one label
pub async fn info_handler(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> Result<Json<InfoResponse>> {
    let text = state.info.lookup(&label)?.to_string();
    Ok(Json(InfoResponse { label, text }))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_loaded = state.model.is_loaded();
    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" }.to_string(),
        model_loaded,
        model_error: state.model.unavailable_reason().map(str::to_string),
        labels: state.labels.iter().map(str::to_string).collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
