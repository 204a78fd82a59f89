use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::encode::backend::MediaBackend;
use crate::encode::codec::{EncoderFormat, VideoEncoder, presentation_time_us};
use crate::encode::drain::{DrainMode, EncoderSession, drain_encoder};
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::config::EncoderConfig;
use crate::foundation::core::Frame;
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::mux::muxer::Muxer;
use crate::render::surface::SurfaceRenderer;

/// What a finished encode produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Final output path.
    pub path: PathBuf,
    /// Frames drawn into the encoder.
    pub frames: u64,
    /// Samples written to the container.
    pub samples: u64,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Nominal duration in microseconds.
    pub duration_us: u64,
}

struct RendererGuard(Option<Box<dyn SurfaceRenderer>>);

impl RendererGuard {
    fn release(&mut self) {
        if let Some(mut r) = self.0.take() {
            r.release();
        }
    }
}

impl Drop for RendererGuard {
    fn drop(&mut self) {
        if self.0.is_some() {
            tracing::debug!("releasing renderer during teardown");
        }
        self.release();
    }
}

struct MuxerGuard(Option<Box<dyn Muxer>>);

impl MuxerGuard {
    fn release(&mut self) {
        if let Some(mut m) = self.0.take() {
            m.release();
        }
    }
}

impl Drop for MuxerGuard {
    fn drop(&mut self) {
        if self.0.is_some() {
            tracing::debug!("releasing muxer during teardown");
        }
        self.release();
    }
}

struct EncoderGuard(Option<Box<dyn VideoEncoder>>);

impl EncoderGuard {
    fn release(&mut self) {
        if let Some(mut e) = self.0.take() {
            e.release();
        }
    }
}

impl Drop for EncoderGuard {
    fn drop(&mut self) {
        if self.0.is_some() {
            tracing::debug!("releasing encoder during teardown");
        }
        self.release();
    }
}

/// The muxer writes next to the requested path; the file only takes its real name once
/// finalized, and is removed otherwise.
struct PartialOutput {
    partial: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PartialOutput {
    fn new(target: &Path) -> Self {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".partial");
        Self {
            partial: target.with_file_name(name),
            target: target.to_path_buf(),
            committed: false,
        }
    }

    fn commit(&mut self) -> DaylapseResult<()> {
        if !self.partial.exists() {
            return Err(DaylapseError::mux(format!(
                "finalized output '{}' is missing",
                self.partial.display()
            )));
        }
        if self.target.exists() {
            std::fs::remove_file(&self.target)
                .with_context(|| format!("replace '{}'", self.target.display()))?;
        }
        std::fs::rename(&self.partial, &self.target).with_context(|| {
            format!(
                "move '{}' to '{}'",
                self.partial.display(),
                self.target.display()
            )
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.committed || !self.partial.exists() {
            return;
        }
        match std::fs::remove_file(&self.partial) {
            Ok(()) => tracing::debug!(path = %self.partial.display(), "removed partial output"),
            Err(e) => tracing::warn!(
                path = %self.partial.display(),
                error = %e,
                "failed to remove partial output"
            ),
        }
    }
}

/// Streaming encode session: frames in, one MP4 out.
///
/// Resources are acquired in the order encoder, input surface, muxer, renderer, and released in
/// reverse. Dropping a writer without [`VideoWriter::finish`] tears everything down and leaves no
/// file at the output path.
pub struct VideoWriter {
    // Field order is teardown order.
    renderer: RendererGuard,
    muxer: MuxerGuard,
    encoder: EncoderGuard,
    output: PartialOutput,

    session: EncoderSession,
    cfg: EncoderConfig,
    width: u32,
    height: u32,
    frames: u64,
}

impl VideoWriter {
    /// Acquire encoder, surface, muxer and renderer for `width x height` frames.
    #[tracing::instrument(skip(out, cfg, backend), fields(out = %out.display()))]
    pub fn open(
        out: &Path,
        width: u32,
        height: u32,
        cfg: &EncoderConfig,
        backend: &dyn MediaBackend,
    ) -> DaylapseResult<Self> {
        cfg.validate()?;
        let format = EncoderFormat::from_config(cfg, width, height);
        format.validate()?;
        ensure_parent_dir(out)?;
        let output = PartialOutput::new(out);

        let mut encoder = EncoderGuard(Some(
            backend
                .create_encoder()
                .map_err(|e| acquisition("create encoder", e))?,
        ));
        let surface = {
            let enc = encoder
                .0
                .as_mut()
                .ok_or_else(|| DaylapseError::resource("encoder handle missing"))?;
            enc.configure(&format)
                .map_err(|e| acquisition("configure encoder", e))?;
            let surface = enc
                .create_input_surface()
                .map_err(|e| acquisition("create input surface", e))?;
            if let Err(e) = enc.start() {
                let mut surface = surface;
                surface.release();
                return Err(acquisition("start encoder", e));
            }
            tracing::debug!(encoder = enc.name(), "encoder started");
            surface
        };

        let muxer = match backend.create_muxer(&output.partial, cfg.container) {
            Ok(m) => MuxerGuard(Some(m)),
            Err(e) => {
                let mut surface = surface;
                surface.release();
                return Err(acquisition("create muxer", e));
            }
        };
        let renderer = RendererGuard(Some(
            backend
                .create_renderer(surface)
                .map_err(|e| acquisition("create renderer", e))?,
        ));

        tracing::info!(
            width,
            height,
            fps = cfg.frame_rate,
            bitrate = cfg.bitrate,
            "video writer opened"
        );
        Ok(Self {
            renderer,
            muxer,
            encoder,
            output,
            session: EncoderSession::new(),
            cfg: cfg.clone(),
            width,
            height,
            frames: 0,
        })
    }

    /// Frame size this writer accepts.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frames drawn so far.
    pub fn frames_pushed(&self) -> u64 {
        self.frames
    }

    /// Encoder/muxer handshake state.
    pub fn session(&self) -> &EncoderSession {
        &self.session
    }

    /// Draw the next frame and move whatever the encoder has ready into the muxer.
    pub fn push_frame(&mut self, frame: &Frame) -> DaylapseResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(DaylapseError::invalid_frame(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let pts = presentation_time_us(self.frames, self.cfg.frame_rate);
        let renderer = self
            .renderer
            .0
            .as_mut()
            .ok_or_else(|| DaylapseError::render("renderer already released"))?;
        renderer.draw(frame, pts)?;
        self.frames += 1;
        tracing::trace!(frame = self.frames - 1, pts_us = pts, "frame drawn");
        self.drain(DrainMode::Poll)
    }

    /// Signal end of stream, flush, finalize the container and move it into place.
    #[tracing::instrument(skip(self), fields(out = %self.output.target.display()))]
    pub fn finish(mut self) -> DaylapseResult<EncodeSummary> {
        self.encoder_mut()?.signal_end_of_input()?;
        self.drain(DrainMode::Flush)?;

        self.renderer.release();
        self.encoder_mut()?.stop()?;
        self.encoder.release();

        if !self.session.muxer_started() {
            return Err(DaylapseError::encode(
                "encoder finished without producing an output format",
            ));
        }
        self.muxer
            .0
            .as_mut()
            .ok_or_else(|| DaylapseError::mux("muxer already released"))?
            .stop()?;
        self.muxer.release();
        self.output.commit()?;

        let summary = EncodeSummary {
            path: self.output.target.clone(),
            frames: self.frames,
            samples: self.session.samples_written(),
            width: self.width,
            height: self.height,
            duration_us: presentation_time_us(self.frames, self.cfg.frame_rate),
        };
        tracing::info!(
            frames = summary.frames,
            samples = summary.samples,
            duration_us = summary.duration_us,
            "video written"
        );
        Ok(summary)
    }

    /// Stop early: flush what the encoder holds, tear down and discard the output.
    pub fn abort(mut self) {
        let flushed = self
            .encoder_mut()
            .and_then(|e| e.signal_end_of_input())
            .and_then(|()| self.drain(DrainMode::Flush));
        if let Err(e) = flushed {
            tracing::warn!(error = %e, "flush during abort failed");
        }
        tracing::info!(frames = self.frames, "video writer aborted");
    }

    fn encoder_mut(&mut self) -> DaylapseResult<&mut Box<dyn VideoEncoder>> {
        self.encoder
            .0
            .as_mut()
            .ok_or_else(|| DaylapseError::encode("encoder already released"))
    }

    fn drain(&mut self, mode: DrainMode) -> DaylapseResult<()> {
        let (Some(encoder), Some(muxer)) = (self.encoder.0.as_mut(), self.muxer.0.as_mut()) else {
            return Err(DaylapseError::encode("drain after teardown"));
        };
        drain_encoder(
            encoder.as_mut(),
            muxer.as_mut(),
            &mut self.session,
            mode,
            self.cfg.dequeue_timeout(),
        )
    }
}

fn acquisition(step: &str, err: DaylapseError) -> DaylapseError {
    match err {
        DaylapseError::Validation(_)
        | DaylapseError::InvalidFrame(_)
        | DaylapseError::ResourceAcquisition(_) => err,
        other => DaylapseError::resource(format!("{step}: {other}")),
    }
}

/// Encode `frames` in order into an MP4 at `out`.
///
/// Frames are rescaled to even dimensions first; every frame must end up the size of the
/// first. Returns `Ok(None)` without touching the encoder or the filesystem when there are no
/// frames.
pub fn encode_frames<I>(
    frames: I,
    out: &Path,
    cfg: &EncoderConfig,
    backend: &dyn MediaBackend,
) -> DaylapseResult<Option<EncodeSummary>>
where
    I: IntoIterator<Item = Frame>,
{
    let mut frames = frames.into_iter();
    let Some(first) = frames.next() else {
        tracing::info!("no frames to encode");
        return Ok(None);
    };
    let first = first.to_even()?;
    let mut writer = VideoWriter::open(out, first.width(), first.height(), cfg, backend)?;
    writer.push_frame(&first)?;
    for frame in frames {
        writer.push_frame(&frame.to_even()?)?;
    }
    writer.finish().map(Some)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/writer.rs"]
mod tests;
