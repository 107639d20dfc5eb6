use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Colour for a usage/capacity ratio: green when idle, yellow at half, red
/// when full, magenta once over capacity.
pub fn congestion_color(ratio: f32) -> Rgb<u8> {
    if !ratio.is_finite() || ratio > 1.0 {
        return Rgb([230, 0, 230]);
    }
    let r = ratio.max(0.0);
    if r < 0.5 {
        let t = r / 0.5;
        Rgb([(255.0 * t) as u8, 200, 40])
    } else {
        let t = (r - 0.5) / 0.5;
        Rgb([255, (200.0 * (1.0 - t)) as u8, 40])
    }
}

/// Renders one tile of `scale` x `scale` pixels per gcell. `values` is row
/// major with `y = 0` at the bottom of the image.
pub fn render_congestion_map(values: &[f32], width: u32, height: u32, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    let mut img = RgbImage::from_pixel(width * scale, height * scale, Rgb([20, 20, 20]));
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            let Some(&ratio) = values.get(idx) else {
                continue;
            };
            let top = (height - 1 - y) * scale;
            let rect = ImageRect::at((x * scale) as i32, top as i32).of_size(scale, scale);
            draw_filled_rect_mut(&mut img, rect, congestion_color(ratio));
        }
    }
    img
}

pub fn draw_congestion_map(
    values: &[f32],
    width: u32,
    height: u32,
    filename: &str,
    scale: u32,
) -> image::ImageResult<()> {
    render_congestion_map(values, width, height, scale).save(Path::new(filename))
}
