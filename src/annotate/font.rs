use ab_glyph::FontVec;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Fonts tried, in order, when no font is configured.
const SYSTEM_FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn load_font_file(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)
        .map_err(|e| AppError::FontLoad(format!("{}: {e}", path.display())))?;
    FontVec::try_from_vec(data)
        .map_err(|e| AppError::FontLoad(format!("{}: {e}", path.display())))
}

/// Load the configured font, or the first usable system font.
pub fn load_font(configured: Option<&Path>) -> Result<FontVec> {
    if let Some(path) = configured {
        return load_font_file(path);
    }

    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|p| p.is_file())
        .find_map(|p| match load_font_file(&p) {
            Ok(font) => {
                tracing::debug!("Using overlay font {:?}", p);
                Some(font)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        })
        .ok_or_else(|| AppError::FontLoad("no usable system font found".to_string()))
}
