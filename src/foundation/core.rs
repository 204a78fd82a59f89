use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context as _;
use image::{RgbaImage, imageops::FilterType};

use crate::foundation::error::{DaylapseError, DaylapseResult};

/// An immutable RGBA8 pixel grid.
///
/// Frames are produced once and then handed from stage to stage by value; no stage mutates a
/// frame it did not create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    /// Wrap an existing RGBA8 image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Build a frame from tightly packed, row-major RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> DaylapseResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(DaylapseError::invalid_frame(format!(
                "expected {expected} bytes for {width}x{height} rgba8, got {}",
                data.len()
            )));
        }
        let image = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| DaylapseError::invalid_frame("rgba8 buffer rejected by image"))?;
        Ok(Self { image })
    }

    /// A frame filled with one opaque or translucent color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        }
    }

    /// Decode an image file, center-crop it to a square and resize it to `size`.
    ///
    /// This is the guide acquisition used by the CLI; it mirrors what a camera/gallery picker
    /// hands to the pipeline.
    pub fn open_square(path: &Path, size: u32) -> DaylapseResult<Self> {
        if size == 0 {
            return Err(DaylapseError::validation("guide size must be non-zero"));
        }
        let decoded = image::open(path)
            .with_context(|| format!("decode guide image '{}'", path.display()))?
            .to_rgba8();
        let (w, h) = decoded.dimensions();
        if w == 0 || h == 0 {
            return Err(DaylapseError::invalid_frame(format!(
                "guide image '{}' has zero area",
                path.display()
            )));
        }

        let side = w.min(h);
        let x = (w - side) / 2;
        let y = (h - side) / 2;
        let square = image::imageops::crop_imm(&decoded, x, y, side, side).to_image();
        if side == size {
            return Ok(Self::from_image(square));
        }
        Ok(Self::from_image(image::imageops::resize(
            &square,
            size,
            size,
            FilterType::Triangle,
        )))
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Return `true` when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the underlying image.
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Borrow the tightly packed RGBA8 bytes.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Unwrap into the underlying image.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Rescale to the nearest even width and height (yuv420p needs both to be even).
    ///
    /// Frames that are already even are returned unchanged.
    pub fn to_even(self) -> DaylapseResult<Self> {
        let (w, h) = self.dimensions();
        let even_w = w - (w % 2);
        let even_h = h - (h % 2);
        if even_w == 0 || even_h == 0 {
            return Err(DaylapseError::invalid_frame(format!(
                "{w}x{h} frame is too small to encode"
            )));
        }
        if even_w == w && even_h == h {
            return Ok(self);
        }
        Ok(Self::from_image(image::imageops::resize(
            &self.image,
            even_w,
            even_h,
            FilterType::Triangle,
        )))
    }

    /// Write the frame as a PNG, creating parent directories as needed.
    pub fn save_png(&self, path: &Path) -> DaylapseResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Cooperative cancellation checked between frames.
///
/// Clones share the same flag, so a UI thread can keep one handle while the worker polls another.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`CancelFlag::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
