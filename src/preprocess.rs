// -- external imports
use image::{DynamicImage, ImageReader, imageops::FilterType};
use serde::Deserialize;
use std::io::Cursor;
use std::str::FromStr;
use strum::{Display, EnumString, VariantNames};
use tract_onnx::prelude::Tensor;
use tract_onnx::prelude::tract_ndarray::Array4;

use crate::error::{AppError, Result};

/// Side length of the square input expected by the skin classifier.
pub const DEFAULT_INPUT_SIZE: u32 = 128;

/// Number of colour channels fed to the model (RGB).
pub const CHANNELS: usize = 3;

// -- enums

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
/// Interpolation used when squashing the input to the model resolution
pub enum ResizeFilter {
    #[strum(serialize = "Nearest")]
    Nearest,

    #[strum(serialize = "Triangle")]
    Triangle,

    #[default]
    #[strum(serialize = "CatmullRom")]
    CatmullRom,

    #[strum(serialize = "Gaussian")]
    Gaussian,

    #[strum(serialize = "Lanczos3")]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Custom deserializer with helpful error message
pub fn deserialize_resize_filter<'de, D>(deserializer: D) -> Result<ResizeFilter, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    ResizeFilter::from_str(&value).map_err(|_| {
        let variants = ResizeFilter::VARIANTS;
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", variants.join(", ")).as_str(),
        )
    })
}

// -- structs

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Square side length of the model input
    pub input_size: u32,

    /// Resize interpolation
    #[serde(deserialize_with = "deserialize_resize_filter")]
    pub resize_filter: ResizeFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            resize_filter: ResizeFilter::default(),
        }
    }
}

/// A single-image batch in NHWC layout with raw `[0, 255]` channel values.
#[derive(Debug, Clone)]
pub struct Batch {
    data: Array4<f32>,
}

impl Batch {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn to_tensor(&self) -> Tensor {
        self.data.clone().into()
    }
}

// -- public API

/// Decode an in-memory image, sniffing the format from its content.
///
/// The extension of an upload is never trusted: a `.jpg` holding garbage fails
/// here with [`AppError::ImageDecode`].
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(AppError::ImageDecode("empty input".to_string()));
    }

    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::ImageDecode(e.to_string()))?
        .decode()
        .map_err(|e| AppError::ImageDecode(e.to_string()))
}

/// Resize (ignoring aspect ratio) to the model resolution and pack into a
/// `(1, size, size, 3)` batch. Alpha is dropped and greyscale is expanded so
/// the channel count never depends on the source format.
pub fn preprocess_image(image: &DynamicImage, cfg: &PreprocessConfig) -> Batch {
    let size = cfg.input_size;
    let rgb = image
        .resize_exact(size, size, cfg.resize_filter.into())
        .to_rgb8();

    let side = size as usize;
    let data = Array4::from_shape_fn((1, side, side, CHANNELS), |(_, y, x, c)| {
        f32::from(rgb.get_pixel(x as u32, y as u32)[c])
    });

    Batch { data }
}

/// [`decode_image`] followed by [`preprocess_image`].
pub fn preprocess_bytes(bytes: &[u8], cfg: &PreprocessConfig) -> Result<Batch> {
    let image = decode_image(bytes)?;
    Ok(preprocess_image(&image, cfg))
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Luma, Rgb, Rgba};

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_shape_is_fixed_for_any_aspect_ratio() {
        let cfg = PreprocessConfig::default();
        for (w, h) in [(1, 1), (640, 480), (37, 1200), (128, 128)] {
            let img = DynamicImage::new_rgb8(w, h);
            let batch = preprocess_image(&img, &cfg);
            assert_eq!(batch.shape(), &[1, 128, 128, 3], "input {w}x{h}");
        }
    }

    #[test]
    fn test_values_stay_in_raw_pixel_range() {
        let img = ImageBuffer::from_pixel(50, 20, Rgb([255u8, 0, 128]));
        let batch = preprocess_image(&DynamicImage::ImageRgb8(img), &PreprocessConfig::default());

        let data = batch.data();
        assert_eq!(data[[0, 0, 0, 0]], 255.0);
        assert_eq!(data[[0, 64, 64, 1]], 0.0);
        assert_eq!(data[[0, 127, 127, 2]], 128.0);
    }

    #[test]
    fn test_alpha_and_grey_become_three_channels() {
        let cfg = PreprocessConfig {
            input_size: 16,
            resize_filter: ResizeFilter::Nearest,
        };

        let rgba = ImageBuffer::from_pixel(8, 8, Rgba([10u8, 20, 30, 0]));
        let batch = preprocess_image(&DynamicImage::ImageRgba8(rgba), &cfg);
        assert_eq!(batch.shape(), &[1, 16, 16, 3]);
        assert_eq!(batch.data()[[0, 3, 3, 2]], 30.0);

        let grey = ImageBuffer::from_pixel(8, 8, Luma([77u8]));
        let batch = preprocess_image(&DynamicImage::ImageLuma8(grey), &cfg);
        assert_eq!(batch.shape(), &[1, 16, 16, 3]);
        assert_eq!(batch.data()[[0, 0, 0, 0]], 77.0);
        assert_eq!(batch.data()[[0, 0, 0, 2]], 77.0);
    }

    #[test]
    fn test_preprocess_bytes_png_and_jpeg() {
        let img = DynamicImage::new_rgb8(300, 200);
        let cfg = PreprocessConfig::default();

        let png = encode(&img, ImageFormat::Png);
        assert_eq!(preprocess_bytes(&png, &cfg).unwrap().shape(), &[1, 128, 128, 3]);

        let jpeg = encode(&img, ImageFormat::Jpeg);
        assert_eq!(preprocess_bytes(&jpeg, &cfg).unwrap().shape(), &[1, 128, 128, 3]);
    }

    #[test]
    fn test_malformed_input_is_decode_error() {
        let cfg = PreprocessConfig::default();
        assert!(matches!(
            preprocess_bytes(b"definitely not an image", &cfg),
            Err(AppError::ImageDecode(_))
        ));
        assert!(matches!(preprocess_bytes(&[], &cfg), Err(AppError::ImageDecode(_))));

        // valid PNG signature, truncated body
        let png = encode(&DynamicImage::new_rgb8(10, 10), ImageFormat::Png);
        assert!(matches!(
            preprocess_bytes(&png[..png.len() / 2], &cfg),
            Err(AppError::ImageDecode(_))
        ));
    }

    #[test]
    fn test_resize_filter_from_str() {
        assert_eq!(ResizeFilter::from_str("Lanczos3").unwrap(), ResizeFilter::Lanczos3);
        assert!(ResizeFilter::from_str("Bicubic").is_err());
        assert_eq!(ResizeFilter::default().to_string(), "CatmullRom");
    }
}
