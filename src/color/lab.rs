//! sRGB (D65) to CIE L*a*b* and back, in `f32`.
//!
//! White point and matrices follow the common 2-degree observer values, so results agree with
//! the usual image-processing libraries to well under one Lab unit.

/// Reference white X.
const XN: f32 = 0.950_456;
/// Reference white Z.
const ZN: f32 = 1.088_754;

const DELTA: f32 = 6.0 / 29.0;

/// Convert an 8-bit sRGB triple to `[L, a, b]` with `L` in `0..=100`.
pub fn rgb8_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let r = srgb_to_linear(f32::from(rgb[0]) / 255.0);
    let g = srgb_to_linear(f32::from(rgb[1]) / 255.0);
    let b = srgb_to_linear(f32::from(rgb[2]) / 255.0);

    let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

    let fx = lab_f(x / XN);
    let fy = lab_f(y);
    let fz = lab_f(z / ZN);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Convert `[L, a, b]` back to 8-bit sRGB, clipping out-of-gamut values.
pub fn lab_to_rgb8(lab: [f32; 3]) -> [u8; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;

    let x = XN * lab_f_inv(fx);
    let y = lab_f_inv(fy);
    let z = ZN * lab_f_inv(fz);

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    [
        crate::foundation::math::unit_to_u8(linear_to_srgb(r)),
        crate::foundation::math::unit_to_u8(linear_to_srgb(g)),
        crate::foundation::math::unit_to_u8(linear_to_srgb(b)),
    ]
}

pub(crate) fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub(crate) fn linear_to_srgb(c: f32) -> f32 {
    let c = c.max(0.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/lab.rs"]
mod tests;
