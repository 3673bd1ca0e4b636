use thiserror::Error;

use crate::info::InfoLookupError;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum AppError {
    #[error("TOML config file error: {0}")]
    TomlConfig(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Error loading the model: {0}")]
    ModelLoad(String),

    #[error("Model not loaded. Please check the model file.")]
    ModelUnavailable,

    #[error("Uploaded file is not a decodable image: {0}")]
    ImageDecode(String),

    #[error("Image encoding failed: {0}")]
    ImageEncode(String),

    #[error("No image was uploaded")]
    MissingFile,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Unsupported file type {0:?}, expected one of: jpg, jpeg, png")]
    UnsupportedFileType(String),

    #[error("Error in model prediction: {0}")]
    Inference(String),

    #[error("Model produced {actual} scores but {expected} labels are configured")]
    LabelMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    InfoLookup(#[from] InfoLookupError),

    #[error("Font loading failed: {0}")]
    FontLoad(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl AppError {
    /// Stable machine-readable code used by the JSON API.
    pub const fn code(&self) -> &'static str {
        match self {
            AppError::TomlConfig(_) | AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::ModelLoad(_) => "MODEL_LOAD_FAILED",
            AppError::ModelUnavailable => "MODEL_UNAVAILABLE",
            AppError::ImageDecode(_) => "IMAGE_DECODE_FAILED",
            AppError::ImageEncode(_) => "IMAGE_ENCODE_FAILED",
            AppError::MissingFile => "MISSING_FILE",
            AppError::InvalidUpload(_) => "INVALID_UPLOAD",
            AppError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            AppError::Inference(_) => "INFERENCE_FAILED",
            AppError::LabelMismatch { .. } => "LABEL_MISMATCH",
            AppError::InfoLookup(e) => e.code(),
            AppError::FontLoad(_) => "FONT_LOAD_FAILED",
            AppError::Template(_) => "TEMPLATE_ERROR",
        }
    }
}

/// Result type with default AppError
pub type Result<T, E = AppError> = std::result::Result<T, E>;
