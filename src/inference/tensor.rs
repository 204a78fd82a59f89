use image::imageops::FilterType;

use crate::foundation::core::Frame;
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::foundation::math::unit_to_u8;

/// Resize `frame` to `size x size` and lay it out as planar RGB floats in `[-1, 1]`.
///
/// Layout is channel-major (`[R plane, G plane, B plane]`), the usual input layout for image
/// generators. Alpha is dropped.
pub fn frame_to_chw_tensor(frame: &Frame, size: u32) -> DaylapseResult<Vec<f32>> {
    if size == 0 || frame.is_empty() {
        return Err(DaylapseError::invalid_frame(
            "tensor conversion needs a non-empty frame and size",
        ));
    }
    let resized;
    let img = if frame.dimensions() == (size, size) {
        frame.as_image()
    } else {
        resized = image::imageops::resize(frame.as_image(), size, size, FilterType::Triangle);
        &resized
    };

    let plane = (size as usize) * (size as usize);
    let mut out = vec![0.0f32; plane * 3];
    for (i, px) in img.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = f32::from(px[c]) / 127.5 - 1.0;
        }
    }
    Ok(out)
}

/// Inverse of [`frame_to_chw_tensor`]: planar `[-1, 1]` floats back to an opaque frame.
///
/// Values outside the range are clipped.
pub fn chw_tensor_to_frame(data: &[f32], width: u32, height: u32) -> DaylapseResult<Frame> {
    let plane = (width as usize) * (height as usize);
    if plane == 0 {
        return Err(DaylapseError::invalid_frame("tensor output has zero area"));
    }
    if data.len() != plane * 3 {
        return Err(DaylapseError::invalid_frame(format!(
            "expected {} tensor values for 3x{height}x{width}, got {}",
            plane * 3,
            data.len()
        )));
    }

    let mut rgba = Vec::with_capacity(plane * 4);
    for i in 0..plane {
        for c in 0..3 {
            rgba.push(unit_to_u8((data[c * plane + i] + 1.0) * 0.5));
        }
        rgba.push(255);
    }
    Frame::from_rgba8(width, height, rgba)
}

#[cfg(test)]
#[path = "../../tests/unit/inference/tensor.rs"]
mod tests;
