mod annotate;
mod api;
mod classify;
mod error;
mod info;
mod labels;
mod live;
mod logging;
mod model;
mod pages;
mod preprocess;
mod session;
mod toml_utils;

pub use annotate::{AnnotateConfigs, annotate_frame, load_font};
pub use error::{AppError, Result};
pub use info::{InfoConfig, InfoLookupError, InfoTable};
pub use labels::{DEFAULT_LABELS, LabelSet};
pub use live::{FrameAnnotator, encode_jpeg};
pub use logging::{LoggingConfig, init_logger};
pub use model::{ImageClassifier, ModelConfig, ModelHandle, OnnxClassifier};
pub use pages::{Page, PageView, Renderer};
pub use preprocess::{Batch, PreprocessConfig, ResizeFilter, decode_image, preprocess_image};
pub use session::{SESSION_COOKIE, SessionState, SessionStore};
pub use toml_utils::{AppConfig, DEFAULT_CONFIG_FILE, ServerConfig, parse_toml};

// Core classification
pub use classify::{LabelScore, Prediction, classify_bytes, classify_image, stable_argmax};

// Web front end
pub use api::{AppState, ErrorResponse, HealthResponse, InfoResponse, create_router};
