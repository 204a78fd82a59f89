use std::path::Path;

use crate::color::composite::composite;
use crate::encode::backend::MediaBackend;
use crate::encode::writer::{EncodeSummary, VideoWriter};
use crate::foundation::config::{PipelineConfig, TimelapseRequest};
use crate::foundation::core::{CancelFlag, Frame};
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::inference::generator::{FrameGenerator, LatentNoise};
use crate::schedule::scheduler::{ScheduleEntry, TimeOfDay, schedule};

/// A composited frame and the point in the day it shows.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelapseFrame {
    /// Full-resolution composited pixels.
    pub frame: Frame,
    /// Scheduled position in the sequence.
    pub index: usize,
    /// Hour of day, `0..=23`.
    pub hour: u8,
    /// Bucket of `hour`.
    pub time_of_day: TimeOfDay,
    /// Time value the generator was called with.
    pub model_time: f32,
}

impl TimelapseFrame {
    /// Display label such as `"sunset (18:00)"`.
    pub fn time_label(&self) -> String {
        TimeOfDay::clock_label(self.hour)
    }
}

/// Frames produced by [`generate_frames`].
#[derive(Clone, Debug)]
pub struct TimelapseReport {
    /// Scheduled frame count.
    pub requested: usize,
    /// Indices the generator failed on.
    pub skipped: Vec<usize>,
    /// Surviving frames in schedule order.
    pub frames: Vec<TimelapseFrame>,
}

impl TimelapseReport {
    /// Number of frames that survived inference.
    pub fn produced(&self) -> usize {
        self.frames.len()
    }
}

/// Outcome of [`render_timelapse`].
#[derive(Clone, Debug)]
pub struct RenderSummary {
    /// Scheduled frame count.
    pub requested: usize,
    /// Frames drawn into the video.
    pub produced: usize,
    /// Indices the generator failed on.
    pub skipped: Vec<usize>,
    /// The written video; `None` when no frame survived.
    pub video: Option<EncodeSummary>,
}

fn generate_one(
    guide: &Frame,
    entry: &ScheduleEntry,
    request: &TimelapseRequest,
    generator: &mut dyn FrameGenerator,
    latent_dim: usize,
) -> DaylapseResult<Option<TimelapseFrame>> {
    let latent = LatentNoise::for_frame(request.seed, entry.index, latent_dim);
    let low_res = match generator.infer(guide, latent.as_slice(), entry.model_time) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(
                index = entry.index,
                hour = entry.hour,
                error = %e,
                "skipping frame"
            );
            return Ok(None);
        }
    };
    let frame = composite(guide, &low_res, request.alpha)?;
    tracing::debug!(
        index = entry.index,
        hour = entry.hour,
        model_time = entry.model_time,
        "frame composited"
    );
    Ok(Some(TimelapseFrame {
        frame,
        index: entry.index,
        hour: entry.hour,
        time_of_day: entry.time_of_day(),
        model_time: entry.model_time,
    }))
}

fn check_strict(request: &TimelapseRequest, produced: usize) -> DaylapseResult<()> {
    if request.require_all_frames && produced < request.frame_count {
        return Err(DaylapseError::FrameCountMismatch {
            requested: request.frame_count,
            produced,
        });
    }
    Ok(())
}

/// Schedule, infer and composite every frame of `request`, keeping them in memory.
///
/// Generator failures skip the frame. With `require_all_frames`, any skip turns into
/// [`DaylapseError::FrameCountMismatch`].
#[tracing::instrument(skip(guide, request, generator, cfg, cancel), fields(frames = request.frame_count))]
pub fn generate_frames(
    guide: &Frame,
    request: &TimelapseRequest,
    generator: &mut dyn FrameGenerator,
    cfg: &PipelineConfig,
    cancel: &CancelFlag,
) -> DaylapseResult<TimelapseReport> {
    request.validate()?;
    cfg.validate()?;
    let entries = schedule(request.frame_count, request.start_hour, request.end_hour)?;

    let mut frames = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();
    for entry in &entries {
        if cancel.is_cancelled() {
            tracing::info!(index = entry.index, "generation cancelled");
            return Err(DaylapseError::Cancelled);
        }
        match generate_one(guide, entry, request, generator, cfg.latent_dim)? {
            Some(f) => frames.push(f),
            None => skipped.push(entry.index),
        }
    }
    check_strict(request, frames.len())?;

    tracing::info!(
        requested = entries.len(),
        produced = frames.len(),
        skipped = skipped.len(),
        "frames generated"
    );
    Ok(TimelapseReport {
        requested: entries.len(),
        skipped,
        frames,
    })
}

/// Move the frame at `from` so that it ends up at `to`, shifting the frames in between.
pub fn reorder_frames(
    frames: &mut Vec<TimelapseFrame>,
    from: usize,
    to: usize,
) -> DaylapseResult<()> {
    let len = frames.len();
    if from >= len || to >= len {
        return Err(DaylapseError::validation(format!(
            "reorder {from} -> {to} is out of range for {len} frames"
        )));
    }
    let moved = frames.remove(from);
    frames.insert(to, moved);
    Ok(())
}

/// Produce the timelapse and stream each frame straight into the encoder.
///
/// The writer opens lazily on the first surviving frame, so a request whose every frame fails
/// writes nothing and returns `video: None`. Cancellation is checked between frames; a cancelled
/// or strict-failed request tears the writer down and leaves no file at `out`.
#[tracing::instrument(
    skip(guide, request, generator, backend, out, cfg, cancel),
    fields(frames = request.frame_count, out = %out.display())
)]
pub fn render_timelapse(
    guide: &Frame,
    request: &TimelapseRequest,
    generator: &mut dyn FrameGenerator,
    backend: &dyn MediaBackend,
    out: &Path,
    cfg: &PipelineConfig,
    cancel: &CancelFlag,
) -> DaylapseResult<RenderSummary> {
    request.validate()?;
    cfg.validate()?;
    let entries = schedule(request.frame_count, request.start_hour, request.end_hour)?;

    let mut writer: Option<VideoWriter> = None;
    let mut skipped = Vec::new();
    let mut produced = 0usize;
    for entry in &entries {
        if cancel.is_cancelled() {
            if let Some(w) = writer.take() {
                w.abort();
            }
            tracing::info!(index = entry.index, "render cancelled");
            return Err(DaylapseError::Cancelled);
        }
        let Some(tf) = generate_one(guide, entry, request, generator, cfg.latent_dim)? else {
            skipped.push(entry.index);
            continue;
        };
        let frame = tf.frame.to_even()?;
        if writer.is_none() {
            writer = Some(VideoWriter::open(
                out,
                frame.width(),
                frame.height(),
                &cfg.encoder,
                backend,
            )?);
        }
        if let Some(w) = writer.as_mut() {
            w.push_frame(&frame)?;
        }
        produced += 1;
    }

    if let Err(e) = check_strict(request, produced) {
        if let Some(w) = writer.take() {
            w.abort();
        }
        return Err(e);
    }

    let video = writer.map(VideoWriter::finish).transpose()?;
    if video.is_none() {
        tracing::warn!("no frame survived inference; nothing written");
    }
    Ok(RenderSummary {
        requested: entries.len(),
        produced,
        skipped,
        video,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/timelapse.rs"]
mod tests;
