use axum::body::Bytes;
use axum::extract::Multipart;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

use crate::error::{AppError, Result};

/// File extensions accepted by the upload control.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Multipart field holding the image.
pub const UPLOAD_FIELD: &str = "image";

#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// `data:` URI for echoing the upload back into a page. `None` when the
    /// content is not a recognisable image.
    pub fn data_uri(&self) -> Option<String> {
        let format = image::guess_format(&self.bytes).ok()?;
        Some(format!(
            "data:{};base64,{}",
            format.to_mime_type(),
            STANDARD.encode(&self.bytes)
        ))
    }
}

pub fn is_accepted_image_name(name: &str) -> bool {
    Path::new(name).extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        ACCEPTED_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Pull the image field out of a multipart form.
///
/// A browser submits an empty, unnamed file part when nothing was chosen;
/// that counts as a missing file.
pub async fn read_image_upload(multipart: &mut Multipart) -> Result<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidUpload(e.to_string()))?;

        if file_name.is_empty() && bytes.is_empty() {
            return Err(AppError::MissingFile);
        }
        if !is_accepted_image_name(&file_name) {
            return Err(AppError::UnsupportedFileType(file_name));
        }

        tracing::debug!("Received upload {:?} ({} bytes)", file_name, bytes.len());
        return Ok(ImageUpload { file_name, bytes });
    }

    Err(AppError::MissingFile)
}
