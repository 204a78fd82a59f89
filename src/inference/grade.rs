use image::{RgbaImage, imageops::FilterType};

use crate::color::lab::{linear_to_srgb, srgb_to_linear};
use crate::foundation::core::Frame;
use crate::foundation::math::unit_to_u8;
use crate::inference::generator::{FrameGenerator, InferenceFailure};

/// Light color and exposure at a given hour. Interpolated linearly, wraps at 24.
const PALETTE: [(f32, [f32; 3], f32); 7] = [
    (0.0, [0.20, 0.26, 0.55], 0.30),
    (5.5, [1.00, 0.62, 0.48], 0.75),
    (8.0, [1.00, 0.93, 0.82], 0.95),
    (13.0, [1.00, 1.00, 1.00], 1.05),
    (18.0, [1.00, 0.55, 0.28], 0.85),
    (20.5, [0.45, 0.36, 0.65], 0.50),
    (24.0, [0.20, 0.26, 0.55], 0.30),
];

const LATENT_STRENGTH: f32 = 0.025;

/// Procedural stand-in for a learned generator.
///
/// Downsamples the guide and grades it toward the light of the requested hour; the latent
/// vector nudges the white balance so different seeds give visibly different frames.
#[derive(Clone, Debug)]
pub struct GradeGenerator {
    size: u32,
}

impl GradeGenerator {
    /// Generator whose output's longer side is at most `size` pixels.
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Output dimensions for a guide of `width x height`.
    ///
    /// Only exact integer reductions are used so the output keeps the guide's aspect ratio
    /// precisely.
    pub fn output_dims(&self, width: u32, height: u32) -> (u32, u32) {
        let g = gcd(width, height);
        let longest = width.max(height);
        let factor = (1..=g)
            .filter(|k| g % k == 0)
            .find(|k| longest / k <= self.size)
            .unwrap_or(g);
        (width / factor, height / factor)
    }
}

impl Default for GradeGenerator {
    fn default() -> Self {
        Self::new(128)
    }
}

impl FrameGenerator for GradeGenerator {
    fn infer(
        &mut self,
        guide: &Frame,
        latent: &[f32],
        model_time: f32,
    ) -> Result<Frame, InferenceFailure> {
        if guide.is_empty() {
            return Err(InferenceFailure::new("guide frame is empty"));
        }
        if !model_time.is_finite() {
            return Err(InferenceFailure::new(format!(
                "model_time must be finite (got {model_time})"
            )));
        }

        let (w, h) = self.output_dims(guide.width(), guide.height());
        let small = if (w, h) == guide.dimensions() {
            guide.as_image().clone()
        } else {
            image::imageops::resize(guide.as_image(), w, h, FilterType::Triangle)
        };

        let (tint, exposure) = light_at(model_time.rem_euclid(1.0) * 24.0);
        let shift = latent_shift(latent);

        let out = RgbaImage::from_fn(w, h, |x, y| {
            let p = small.get_pixel(x, y);
            let mut rgb = [0u8; 3];
            for c in 0..3 {
                let lin = srgb_to_linear(f32::from(p[c]) / 255.0) * tint[c] * exposure;
                rgb[c] = unit_to_u8(linear_to_srgb(lin) + shift[c]);
            }
            image::Rgba([rgb[0], rgb[1], rgb[2], 255])
        });
        Ok(Frame::from_image(out))
    }
}

fn light_at(hour: f32) -> ([f32; 3], f32) {
    for pair in PALETTE.windows(2) {
        let (h0, c0, e0) = pair[0];
        let (h1, c1, e1) = pair[1];
        if hour >= h0 && hour <= h1 {
            let t = if h1 > h0 { (hour - h0) / (h1 - h0) } else { 0.0 };
            let lerp = |a: f32, b: f32| a + (b - a) * t;
            return (
                [lerp(c0[0], c1[0]), lerp(c0[1], c1[1]), lerp(c0[2], c1[2])],
                lerp(e0, e1),
            );
        }
    }
    (PALETTE[0].1, PALETTE[0].2)
}

fn latent_shift(latent: &[f32]) -> [f32; 3] {
    let mut shift = [0.0f32; 3];
    if latent.is_empty() {
        return shift;
    }
    for (c, s) in shift.iter_mut().enumerate() {
        let mut sum = 0.0;
        let mut n = 0.0;
        for v in latent.iter().skip(c).step_by(3) {
            sum += v.clamp(-3.0, 3.0);
            n += 1.0;
        }
        if n > 0.0 {
            // Mean of n standard normals has std 1/sqrt(n); rescale back to unit variance.
            *s = LATENT_STRENGTH * (sum / n) * (n as f32).sqrt();
        }
    }
    shift
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

#[cfg(test)]
#[path = "../../tests/unit/inference/grade.rs"]
mod tests;
