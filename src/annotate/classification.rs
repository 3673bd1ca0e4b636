use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use super::AnnotateConfigs;
use super::annotate_utils::draw_transparent_rect;

/// Draw one line of result text with an optional translucent backing box
pub fn draw_result_text(
    img: &mut RgbImage,
    text: &str,
    color: Rgb<u8>,
    font: &FontVec,
    configs: &AnnotateConfigs,
) {
    if text.is_empty() {
        return;
    }

    let (width, _height) = img.dimensions();

    // Adaptive font scale based on frame width
    let scale_factor = (width as f32 / 640.0).clamp(0.5, 2.0);
    let scale = PxScale::from(configs.font_size * scale_factor);

    let [x_pos, y_pos] = configs.origin;
    let (text_w, text_h) = text_size(scale, font, text);

    if configs.show_background {
        let padding = 5;
        draw_transparent_rect(
            img,
            x_pos - padding,
            y_pos - padding,
            text_w + 2 * padding as u32,
            text_h + 2 * padding as u32,
            Rgb([0, 0, 0]),
            configs.background_alpha,
        );
    }

    draw_text_mut(img, color, x_pos, y_pos, scale, font, text);
}
