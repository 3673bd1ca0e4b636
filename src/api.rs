//! HTTP surface: server-rendered pages, JSON endpoints and the live stream.

// -- submodules
mod dto;
mod rest;
mod stream;
mod upload;
mod web;

pub use dto::{ErrorResponse, HealthResponse, InfoResponse};

// -- external imports
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::classify::{Prediction, classify_bytes};
use crate::error::{AppError, Result};
use crate::info::InfoTable;
use crate::labels::LabelSet;
use crate::live::FrameAnnotator;
use crate::model::ModelHandle;
use crate::pages::{PageView, Renderer};
use crate::preprocess::PreprocessConfig;
use crate::session::SessionStore;
use crate::toml_utils::AppConfig;

/// Application state shared across handlers
pub struct AppState {
    pub model: ModelHandle,
    pub labels: Arc<LabelSet>,
    pub preprocess: PreprocessConfig,
    pub info: InfoTable,
    pub sessions: SessionStore,
    pub renderer: Renderer,
    pub annotator: Arc<FrameAnnotator>,
}

impl AppState {
    /// Wire up everything the handlers need. The model is loaded here; a model
    /// that fails to load leaves the service running in degraded mode.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let labels = LabelSet::resolve(cfg.model.labels.as_deref(), &cfg.model.path)?;
        let model = ModelHandle::load(&cfg.model);
        let info = InfoTable::load(&cfg.info)?;
        Self::new(model, labels, info, cfg)
    }

    pub fn new(
        model: ModelHandle,
        labels: LabelSet,
        info: InfoTable,
        cfg: &AppConfig,
    ) -> Result<Self> {
        let labels = Arc::new(labels);
        let preprocess = cfg.model.preprocess;
        let annotator = Arc::new(FrameAnnotator::new(
            model.clone(),
            labels.clone(),
            preprocess,
            cfg.annotate.clone(),
        ));

        Ok(Self {
            model,
            labels,
            preprocess,
            info,
            sessions: SessionStore::new(
                cfg.server.max_sessions,
                Duration::from_secs(cfg.server.session_idle_secs),
            ),
            renderer: Renderer::new()?,
            annotator,
        })
    }

    /// Classify uploaded bytes on the blocking pool.
    pub async fn predict(self: &Arc<Self>, bytes: Bytes) -> Result<Prediction> {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            classify_bytes(&state.model, &state.labels, &bytes, &state.preprocess)
        })
        .await
        .map_err(|e| AppError::Inference(format!("inference task failed: {e}")))?
    }

    /// View carrying the state every page shows.
    fn base_view(&self) -> PageView {
        PageView {
            model_error: self.model.unavailable_reason().map(str::to_string),
            ..Default::default()
        }
    }
}

/// Create the HTTP router
pub fn create_router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        // Pages and user actions
        .route("/", get(web::index_handler))
        .route("/page/{page}", get(web::page_handler))
        .route("/predict", post(web::predict_handler))
        .route("/show-info", post(web::show_info_handler))
        .route("/info", post(web::info_handler))
        // JSON API
        .route("/api/v1/predict", post(rest::predict_handler))
        .route("/api/v1/info/{label}", get(rest::info_handler))
        .route("/api/v1/health", get(rest::health_handler))
        // Live camera
        .route("/api/v1/stream", get(stream::stream_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
