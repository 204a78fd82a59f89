use crate::encode::codec::InputSurface;
use crate::foundation::core::Frame;
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::render::surface::{PresentationClock, SurfaceRenderer, surface_time_ns};

/// Software rendition of the textured-quad pass.
///
/// Each surface pixel samples the frame at its center with bilinear filtering and
/// clamp-to-edge addressing, which is what the GPU path's linear sampler does.
pub struct CpuSurfaceRenderer {
    surface: Option<Box<dyn InputSurface>>,
    clock: PresentationClock,
    target: Vec<u8>,
}

impl CpuSurfaceRenderer {
    /// Bind to `surface`; the render target takes the surface's size.
    ///
    /// A zero-area surface is released and rejected.
    pub fn new(mut surface: Box<dyn InputSurface>) -> DaylapseResult<Self> {
        let (w, h) = (surface.width(), surface.height());
        if w == 0 || h == 0 {
            surface.release();
            return Err(DaylapseError::resource(format!(
                "input surface has zero area ({w}x{h})"
            )));
        }
        Ok(Self {
            target: vec![0u8; (w as usize) * (h as usize) * 4],
            surface: Some(surface),
            clock: PresentationClock::new(),
        })
    }
}

impl SurfaceRenderer for CpuSurfaceRenderer {
    fn name(&self) -> &str {
        "cpu"
    }

    fn draw(&mut self, frame: &Frame, presentation_time_us: u64) -> DaylapseResult<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(DaylapseError::render("draw after release"));
        };
        if frame.is_empty() {
            return Err(DaylapseError::invalid_frame("cannot draw an empty frame"));
        }
        self.clock.advance(presentation_time_us)?;

        let (w, h) = (surface.width(), surface.height());
        if frame.dimensions() == (w, h) {
            self.target.copy_from_slice(frame.as_raw());
        } else {
            draw_quad(&mut self.target, w, h, frame);
        }
        surface.queue_frame(&self.target, surface_time_ns(presentation_time_us))
    }

    fn release(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            self.target = Vec::new();
            surface.release();
            tracing::debug!("cpu renderer released");
        }
    }
}

fn draw_quad(dst: &mut [u8], width: u32, height: u32, frame: &Frame) {
    let src = frame.as_image();
    let (tw, th) = src.dimensions();
    let sx = tw as f32 / width as f32;
    let sy = th as f32 / height as f32;

    for y in 0..height {
        let v = (y as f32 + 0.5) * sy - 0.5;
        let y0 = v.floor();
        let fy = v - y0;
        let ya = clamp_texel(y0 as i64, th);
        let yb = clamp_texel(y0 as i64 + 1, th);
        for x in 0..width {
            let u = (x as f32 + 0.5) * sx - 0.5;
            let x0 = u.floor();
            let fx = u - x0;
            let xa = clamp_texel(x0 as i64, tw);
            let xb = clamp_texel(x0 as i64 + 1, tw);

            let p00 = src.get_pixel(xa, ya).0;
            let p10 = src.get_pixel(xb, ya).0;
            let p01 = src.get_pixel(xa, yb).0;
            let p11 = src.get_pixel(xb, yb).0;

            let o = ((y as usize) * (width as usize) + x as usize) * 4;
            for c in 0..4 {
                let top = f32::from(p00[c]) * (1.0 - fx) + f32::from(p10[c]) * fx;
                let bottom = f32::from(p01[c]) * (1.0 - fx) + f32::from(p11[c]) * fx;
                dst[o + c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn clamp_texel(i: i64, len: u32) -> u32 {
    i.clamp(0, i64::from(len) - 1) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
