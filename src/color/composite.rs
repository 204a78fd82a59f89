use image::{ImageBuffer, Rgb, Rgb32FImage, RgbaImage, imageops::FilterType};

use crate::color::lab::{lab_to_rgb8, rgb8_to_lab};
use crate::foundation::core::Frame;
use crate::foundation::error::{DaylapseError, DaylapseResult};

/// Merge a high-resolution guide with a low-resolution color frame in L*a*b*.
///
/// The output has the guide's dimensions. Lightness is `alpha * L_guide + (1 - alpha) * L_color`
/// and chrominance comes entirely from the color frame after cubic upsampling. The output is
/// opaque.
///
/// Both frames must be non-empty and share an aspect ratio; `alpha` must lie in `[0, 1]`.
pub fn composite(guide: &Frame, low_res: &Frame, alpha: f32) -> DaylapseResult<Frame> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(DaylapseError::validation(format!(
            "composite alpha must be in [0, 1] (got {alpha})"
        )));
    }
    if guide.is_empty() || low_res.is_empty() {
        return Err(DaylapseError::invalid_frame(format!(
            "composite inputs must be non-empty (guide {}x{}, color {}x{})",
            guide.width(),
            guide.height(),
            low_res.width(),
            low_res.height()
        )));
    }
    let (gw, gh) = guide.dimensions();
    let (lw, lh) = low_res.dimensions();
    if u64::from(gw) * u64::from(lh) != u64::from(lw) * u64::from(gh) {
        return Err(DaylapseError::invalid_frame(format!(
            "composite aspect mismatch: guide {gw}x{gh}, color {lw}x{lh}"
        )));
    }

    let color_lab = upsample_lab(to_normalized_lab(low_res.as_image()), gw, gh);

    let mut out = RgbaImage::new(gw, gh);
    for ((guide_px, color_px), out_px) in guide
        .as_image()
        .pixels()
        .zip(color_lab.pixels())
        .zip(out.pixels_mut())
    {
        let guide_l = rgb8_to_lab([guide_px[0], guide_px[1], guide_px[2]])[0];
        let [color_l, a, b] = denormalize(color_px.0);
        let l = (alpha * guide_l + (1.0 - alpha) * color_l).clamp(0.0, 100.0);
        let [r, g, bl] = lab_to_rgb8([l, a, b]);
        *out_px = image::Rgba([r, g, bl, 255]);
    }

    Ok(Frame::from_image(out))
}

// Lab planes are stored as L/100 and (ab + 128)/255 so every channel sits in [0, 1]; the
// resampler clamps float pixels to that range.
fn to_normalized_lab(img: &RgbaImage) -> Rgb32FImage {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let [l, a, b] = rgb8_to_lab([p[0], p[1], p[2]]);
        Rgb([l / 100.0, (a + 128.0) / 255.0, (b + 128.0) / 255.0])
    })
}

fn denormalize(p: [f32; 3]) -> [f32; 3] {
    [p[0] * 100.0, p[1] * 255.0 - 128.0, p[2] * 255.0 - 128.0]
}

fn upsample_lab(lab: Rgb32FImage, width: u32, height: u32) -> Rgb32FImage {
    if lab.dimensions() == (width, height) {
        return lab;
    }
    image::imageops::resize(&lab, width, height, FilterType::CatmullRom)
}

#[cfg(test)]
#[path = "../../tests/unit/color/composite.rs"]
mod tests;
