use ab_glyph::FontVec;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::sync::Arc;

use crate::annotate::{AnnotateConfigs, annotate_frame, load_font};
use crate::classify::classify_image;
use crate::error::{AppError, Result};
use crate::labels::LabelSet;
use crate::model::ModelHandle;
use crate::preprocess::{PreprocessConfig, decode_image};

/// Per-frame classify-and-overlay step behind the camera stream.
///
/// Stateless between frames: every call decodes, classifies, draws and
/// re-encodes one frame on the caller's thread.
pub struct FrameAnnotator {
    model: ModelHandle,
    labels: Arc<LabelSet>,
    preprocess: PreprocessConfig,
    configs: AnnotateConfigs,
    font: Option<FontVec>,
}

impl FrameAnnotator {
    /// Builds the annotator, loading the overlay font once. A missing font only
    /// disables the text overlay.
    pub fn new(
        model: ModelHandle,
        labels: Arc<LabelSet>,
        preprocess: PreprocessConfig,
        configs: AnnotateConfigs,
    ) -> Self {
        let font = match load_font(configs.font.as_deref()) {
            Ok(font) => Some(font),
            Err(e) => {
                tracing::warn!("{}; live frames will not be annotated", e);
                None
            }
        };

        Self {
            model,
            labels,
            preprocess,
            configs,
            font,
        }
    }

    /// Decode a frame, classify it, draw the outcome and return it as JPEG.
    ///
    /// Classification failures are drawn onto the frame; only undecodable
    /// input or an encoding failure is returned as an error.
    pub fn process_frame(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let frame = decode_image(bytes)?;
        let outcome = classify_image(&self.model, &self.labels, &frame, &self.preprocess);
        if let Err(e) = &outcome {
            tracing::debug!("Frame classification failed: {}", e);
        }

        let annotated = annotate_frame(&frame, &outcome, &self.configs, self.font.as_ref());
        encode_jpeg(&DynamicImage::ImageRgb8(annotated), self.configs.jpeg_quality)
    }
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| AppError::ImageEncode(e.to_string()))?;
    Ok(buf)
}
