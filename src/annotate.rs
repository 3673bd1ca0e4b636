// -- submodules
mod annotate_utils;
mod classification;
mod font;

pub use font::load_font;

use classification::draw_result_text;

// -- external imports
use ab_glyph::FontVec;
use image::{DynamicImage, Rgb, RgbImage};
use serde::Deserialize;
use std::path::PathBuf;

// -- crate imports
use crate::classify::Prediction;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotateConfigs {
    /// TrueType font for the overlay; a system font is used when unset
    pub font: Option<PathBuf>,

    /// Top-left corner of the result text
    pub origin: [i32; 2],

    /// Font height in pixels for a 640 px wide frame
    pub font_size: f32,

    /// Colour of a successful result
    pub text_color: [u8; 3],

    /// Colour of an error message
    pub error_color: [u8; 3],

    /// whether to darken the area behind the text
    pub show_background: bool,

    /// Opacity of the backing box
    pub background_alpha: f32,

    /// Quality of re-encoded frames (1-100)
    pub jpeg_quality: u8,
}

impl Default for AnnotateConfigs {
    fn default() -> Self {
        Self {
            font: None,
            origin: [10, 10],
            font_size: 28.0,
            text_color: [0, 255, 0],
            error_color: [255, 64, 64],
            show_background: true,
            background_alpha: 0.4,
            jpeg_quality: 85,
        }
    }
}

/// Overlay a classification outcome on a frame.
///
/// Without a font the frame is returned unchanged.
pub fn annotate_frame(
    img: &DynamicImage,
    outcome: &Result<Prediction>,
    configs: &AnnotateConfigs,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut annotated = img.to_rgb8();

    let Some(font) = font else {
        return annotated;
    };

    let (text, color) = match outcome {
        Ok(prediction) => (prediction.overlay_text(), configs.text_color),
        Err(e) => (e.to_string(), configs.error_color),
    };
    draw_result_text(&mut annotated, &text, Rgb(color), font, configs);

    annotated
}
