use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

use crate::error::{AppError, Result};
use crate::labels::LabelSet;
use crate::model::ModelHandle;
use crate::preprocess::{Batch, PreprocessConfig, preprocess_bytes, preprocess_image};

/// Score assigned to one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Position of the winning class in the label set
    pub index: usize,

    /// Name of the winning class
    pub label: String,

    /// Winning score as a percentage in `[0, 100]`
    pub confidence: f32,

    /// Raw score of every class, in label order
    pub scores: Vec<LabelScore>,
}

impl Prediction {
    /// Text drawn on live frames, e.g. `Acne: 97.12%`.
    pub fn overlay_text(&self) -> String {
        format!("{}: {:.2}%", self.label, self.confidence)
    }

    /// Sentence shown on the recognition page.
    pub fn summary(&self) -> String {
        format!(
            "Model is predicting it's {} with {:.2}% confidence",
            self.label, self.confidence
        )
    }
}

/// Index and value of the maximum score. Ties go to the lowest index and NaN
/// never wins; `None` when no finite-or-infinite score exists.
pub fn stable_argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if v <= bv => best,
            _ => Some((i, v)),
        })
}

/// Run the model on a prepared batch and pick the winning label.
pub fn classify_batch(
    model: &ModelHandle,
    labels: &LabelSet,
    batch: &Batch,
) -> Result<Prediction> {
    let classifier = model.classifier()?;

    let start_time = Instant::now();
    let scores = classifier.predict(batch)?;
    tracing::debug!("Inference took {:.3?}", start_time.elapsed());

    if scores.len() != labels.len() {
        return Err(AppError::LabelMismatch {
            expected: labels.len(),
            actual: scores.len(),
        });
    }

    let (index, best) = stable_argmax(&scores)
        .ok_or_else(|| AppError::Inference("model returned no usable scores".to_string()))?;

    // checked above: one label per score
    let label = labels.get(index).unwrap_or_default().to_string();

    let scores = labels
        .iter()
        .zip(&scores)
        .map(|(label, &score)| LabelScore {
            label: label.to_string(),
            score,
        })
        .collect();

    Ok(Prediction {
        index,
        label,
        confidence: (best * 100.0).clamp(0.0, 100.0),
        scores,
    })
}

pub fn classify_image(
    model: &ModelHandle,
    labels: &LabelSet,
    image: &DynamicImage,
    cfg: &PreprocessConfig,
) -> Result<Prediction> {
    // skip the resize work entirely when nothing can consume it
    model.classifier()?;
    classify_batch(model, labels, &preprocess_image(image, cfg))
}

pub fn classify_bytes(
    model: &ModelHandle,
    labels: &LabelSet,
    bytes: &[u8],
    cfg: &PreprocessConfig,
) -> Result<Prediction> {
    model.classifier()?;
    classify_batch(model, labels, &preprocess_bytes(bytes, cfg)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::ImageClassifier;
    use image::ImageFormat;
    use std::io::Cursor;

    /// Returns the same scores for every input.
    pub(crate) struct FixedScores(pub Vec<f32>);

    impl ImageClassifier for FixedScores {
        fn predict(&self, _batch: &Batch) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl ImageClassifier for Failing {
        fn predict(&self, _batch: &Batch) -> Result<Vec<f32>> {
            Err(AppError::Inference("backend exploded".to_string()))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(64, 40)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_stable_argmax_prefers_first_max() {
        assert_eq!(stable_argmax(&[0.1, 0.4, 0.4, 0.1]), Some((1, 0.4)));
        assert_eq!(stable_argmax(&[0.25; 4]), Some((0, 0.25)));
        assert_eq!(stable_argmax(&[0.0, 0.0, 1.0]), Some((2, 1.0)));
        assert_eq!(stable_argmax(&[]), None);
    }

    #[test]
    fn test_stable_argmax_ignores_nan() {
        assert_eq!(stable_argmax(&[f32::NAN, 0.2, 0.1]), Some((1, 0.2)));
        assert_eq!(stable_argmax(&[f32::NAN, f32::NAN]), None);
    }

    #[test]
    fn test_confidence_is_max_times_hundred() {
        let model = ModelHandle::from_classifier(FixedScores(vec![0.05, 0.15, 0.7, 0.1]));
        let pred = classify_bytes(&model, &LabelSet::default(), &png_bytes(), &Default::default())
            .unwrap();

        assert_eq!(pred.index, 2);
        assert_eq!(pred.label, "Melanoma");
        assert!((pred.confidence - 70.0).abs() < 1e-4);
        assert_eq!(pred.scores.len(), 4);
        assert_eq!(pred.scores[3].label, "Normal");
        assert_eq!(pred.overlay_text(), "Melanoma: 70.00%");
        assert_eq!(
            pred.summary(),
            "Model is predicting it's Melanoma with 70.00% confidence"
        );
    }

    #[test]
    fn test_tie_resolves_to_first_label() {
        let model = ModelHandle::from_classifier(FixedScores(vec![0.1, 0.45, 0.45, 0.0]));
        let pred = classify_bytes(&model, &LabelSet::default(), &png_bytes(), &Default::default())
            .unwrap();
        assert_eq!(pred.label, "Eczema");
    }

    #[test]
    fn test_unavailable_model_reports_error() {
        let model = ModelHandle::Unavailable {
            reason: "missing".to_string(),
        };
        let labels = LabelSet::default();

        assert!(matches!(
            classify_bytes(&model, &labels, &png_bytes(), &Default::default()),
            Err(AppError::ModelUnavailable)
        ));
        // even garbage input reports the model state first
        assert!(matches!(
            classify_bytes(&model, &labels, b"garbage", &Default::default()),
            Err(AppError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_output_length_mismatch_is_error() {
        let model = ModelHandle::from_classifier(FixedScores(vec![0.5, 0.5]));
        let err = classify_bytes(&model, &LabelSet::default(), &png_bytes(), &Default::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::LabelMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_backend_failure_is_inference_error() {
        let model = ModelHandle::from_classifier(Failing);
        assert!(matches!(
            classify_bytes(&model, &LabelSet::default(), &png_bytes(), &Default::default()),
            Err(AppError::Inference(_))
        ));
    }

    #[test]
    fn test_corrupt_upload_is_decode_error() {
        let model = ModelHandle::from_classifier(FixedScores(vec![1.0, 0.0, 0.0, 0.0]));
        assert!(matches!(
            classify_bytes(&model, &LabelSet::default(), b"\xff\xd8 broken", &Default::default()),
            Err(AppError::ImageDecode(_))
        ));
    }
}
