use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tract_onnx::prelude::*;

use crate::error::{AppError, Result};
use crate::preprocess::{Batch, CHANNELS, PreprocessConfig};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to ONNX model file
    pub path: PathBuf,

    /// Class names in model output order; falls back to `labels.txt` beside the model
    pub labels: Option<Vec<String>>,

    /// Preprocessing applied to every input
    #[serde(flatten)]
    pub preprocess: PreprocessConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/cnn_skin_disease_model.onnx"),
            labels: None,
            preprocess: PreprocessConfig::default(),
        }
    }
}

/// Anything that maps a preprocessed batch to one score per class.
pub trait ImageClassifier: Send + Sync {
    fn predict(&self, batch: &Batch) -> Result<Vec<f32>>;
}

/// Classifier backed by an ONNX graph executed with tract.
#[derive(Debug)]
pub struct OnnxClassifier {
    runnable: RunnableModel,
    input_size: u32,
}

impl OnnxClassifier {
    /// Load and optimize the graph with its input pinned to `[1, size, size, 3]`.
    pub fn load(model_path: &Path, input_size: u32) -> Result<Self> {
        if !model_path.is_file() {
            return Err(AppError::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let runnable = match load_runnable_model(model_path, input_size, true) {
            Ok(model) => model,
            Err(opt_err) => {
                tracing::warn!(
                    "Model {:?} failed optimized load ({}); falling back to decluttered graph",
                    model_path,
                    opt_err
                );
                load_runnable_model(model_path, input_size, false).map_err(|e| {
                    AppError::ModelLoad(format!("{e} (after optimize error: {opt_err})"))
                })?
            }
        };

        tracing::info!(
            "Loaded model {:?} ({}x{} input)",
            model_path,
            input_size,
            input_size
        );
        Ok(Self {
            runnable,
            input_size,
        })
    }
}

fn load_runnable_model(
    path: &Path,
    input_size: u32,
    optimize: bool,
) -> Result<RunnableModel, String> {
    let side = input_size as usize;
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .map_err(|e| e.to_string())?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, side, side, CHANNELS)),
        )
        .map_err(|e| e.to_string())?;

    let typed = if optimize {
        model.into_optimized()
    } else {
        model.into_typed().and_then(|m| m.into_decluttered())
    }
    .map_err(|e| e.to_string())?;

    typed.into_runnable().map_err(|e| e.to_string())
}

impl ImageClassifier for OnnxClassifier {
    fn predict(&self, batch: &Batch) -> Result<Vec<f32>> {
        let side = self.input_size as usize;
        if batch.shape() != [1, side, side, CHANNELS] {
            return Err(AppError::Inference(format!(
                "batch shape {:?} does not match model input [1, {side}, {side}, {CHANNELS}]",
                batch.shape()
            )));
        }

        let outputs = self
            .runnable
            .run(tvec![batch.to_tensor().into()])
            .map_err(|e| AppError::Inference(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| AppError::Inference("model produced no outputs".to_string()))?;
        let scores = first
            .to_array_view::<f32>()
            .map_err(|e| AppError::Inference(e.to_string()))?;

        Ok(scores.iter().copied().collect())
    }
}

/// Process-wide model state, fixed after startup.
#[derive(Clone)]
pub enum ModelHandle {
    Loaded(Arc<dyn ImageClassifier>),
    Unavailable { reason: String },
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelHandle::Loaded(_) => f.write_str("ModelHandle::Loaded"),
            ModelHandle::Unavailable { reason } => f
                .debug_struct("ModelHandle::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl ModelHandle {
    /// Attempt to load the configured model. A failure is reported once here and
    /// leaves the handle unavailable for the lifetime of the process.
    pub fn load(cfg: &ModelConfig) -> Self {
        match OnnxClassifier::load(&cfg.path, cfg.preprocess.input_size) {
            Ok(model) => ModelHandle::Loaded(Arc::new(model)),
            Err(e) => {
                tracing::error!("{}", e);
                ModelHandle::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn from_classifier(classifier: impl ImageClassifier + 'static) -> Self {
        ModelHandle::Loaded(Arc::new(classifier))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ModelHandle::Loaded(_) => None,
            ModelHandle::Unavailable { reason } => Some(reason),
        }
    }

    pub fn classifier(&self) -> Result<&dyn ImageClassifier> {
        match self {
            ModelHandle::Loaded(model) => Ok(model.as_ref()),
            ModelHandle::Unavailable { .. } => Err(AppError::ModelUnavailable),
        }
    }
}
