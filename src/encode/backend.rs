use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encode::codec::{InputSurface, VideoEncoder};
use crate::encode::ffmpeg::FfmpegEncoder;
use crate::foundation::config::ContainerFormat;
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::mux::mp4::Mp4Muxer;
use crate::mux::muxer::Muxer;
use crate::render::cpu::CpuSurfaceRenderer;
use crate::render::surface::SurfaceRenderer;

/// Which surface renderer to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Software renderer, always available.
    #[default]
    Cpu,
    /// `wgpu` renderer (requires the `gpu` feature).
    Gpu,
}

impl std::str::FromStr for RendererKind {
    type Err = DaylapseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(DaylapseError::validation(format!(
                "unknown renderer '{other}' (expected cpu or gpu)"
            ))),
        }
    }
}

/// Factory for the three platform resources an encode session needs.
pub trait MediaBackend {
    /// A fresh, unconfigured encoder.
    fn create_encoder(&self) -> DaylapseResult<Box<dyn VideoEncoder>>;
    /// A muxer writing `container` data to `path`.
    fn create_muxer(
        &self,
        path: &Path,
        container: ContainerFormat,
    ) -> DaylapseResult<Box<dyn Muxer>>;
    /// A renderer bound to `surface`.
    fn create_renderer(
        &self,
        surface: Box<dyn InputSurface>,
    ) -> DaylapseResult<Box<dyn SurfaceRenderer>>;
}

/// System `ffmpeg` encoder, `muxide` MP4 muxer and the selected renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBackend {
    renderer: RendererKind,
}

impl SystemBackend {
    /// Backend that renders with `renderer`.
    pub fn new(renderer: RendererKind) -> Self {
        Self { renderer }
    }

    /// Selected renderer.
    pub fn renderer(&self) -> RendererKind {
        self.renderer
    }
}

impl MediaBackend for SystemBackend {
    fn create_encoder(&self) -> DaylapseResult<Box<dyn VideoEncoder>> {
        Ok(Box::new(FfmpegEncoder::new()))
    }

    fn create_muxer(
        &self,
        path: &Path,
        container: ContainerFormat,
    ) -> DaylapseResult<Box<dyn Muxer>> {
        match container {
            ContainerFormat::Mp4 => Ok(Box::new(Mp4Muxer::new(path))),
        }
    }

    fn create_renderer(
        &self,
        surface: Box<dyn InputSurface>,
    ) -> DaylapseResult<Box<dyn SurfaceRenderer>> {
        match self.renderer {
            RendererKind::Cpu => Ok(Box::new(CpuSurfaceRenderer::new(surface)?)),
            #[cfg(feature = "gpu")]
            RendererKind::Gpu => Ok(Box::new(crate::render::gpu::GpuSurfaceRenderer::new(
                surface,
            )?)),
            #[cfg(not(feature = "gpu"))]
            RendererKind::Gpu => {
                let mut surface = surface;
                surface.release();
                Err(DaylapseError::resource(
                    "gpu renderer requested but daylapse was built without the `gpu` feature",
                ))
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/backend.rs"]
mod tests;
