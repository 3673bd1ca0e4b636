use image::{Rgb, RgbImage};

/// Draw a transparent rectangle on an image
pub fn draw_transparent_rect(
    img: &mut RgbImage,
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    color: Rgb<u8>,
    alpha: f32,
) {
    let (width, height) = img.dimensions();
    let alpha = alpha.clamp(0.0, 1.0);
    let inv_alpha = 1.0 - alpha;

    let tint = color.0.map(f32::from);

    for dy in 0..h {
        let py = y + dy as i32;
        if py < 0 || py >= height as i32 {
            continue;
        }

        for dx in 0..w {
            let px = x + dx as i32;
            if px < 0 || px >= width as i32 {
                continue;
            }

            let pixel = img.get_pixel_mut(px as u32, py as u32);
            for (channel, t) in pixel.0.iter_mut().zip(tint) {
                *channel = f32::from(*channel).mul_add(inv_alpha, t * alpha) as u8;
            }
        }
    }
}
