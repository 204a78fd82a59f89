use std::fs::File;
use std::path::PathBuf;

use muxide::api::{MuxerBuilder, VideoCodec as MuxideCodec};

use crate::encode::codec::{OutputBuffer, TrackFormat};
use crate::foundation::config::VideoCodec;
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::mux::muxer::{Muxer, TrackId};

enum State {
    Idle,
    TrackAdded(TrackFormat),
    Started(muxide::api::Muxer<File>),
    Stopped,
    Released,
}

/// Single-video-track MP4 writer.
///
/// The first sample must be a keyframe carrying SPS and PPS in Annex B form.
pub struct Mp4Muxer {
    path: PathBuf,
    state: State,
    samples: u64,
}

impl Mp4Muxer {
    /// Muxer that will create `path` on [`Muxer::start`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: State::Idle,
            samples: 0,
        }
    }

    /// Samples written so far.
    pub fn samples_written(&self) -> u64 {
        self.samples
    }
}

impl Muxer for Mp4Muxer {
    fn add_track(&mut self, format: &TrackFormat) -> DaylapseResult<TrackId> {
        if !matches!(self.state, State::Idle) {
            return Err(DaylapseError::mux("mp4 muxer supports a single video track"));
        }
        if format.width == 0 || format.height == 0 || format.frame_rate == 0 {
            return Err(DaylapseError::mux(format!(
                "unusable track format {}x{} @ {} fps",
                format.width, format.height, format.frame_rate
            )));
        }
        // avcC is rebuilt by muxide from the in-band SPS/PPS of the first keyframe.
        if format.sps.is_empty() || format.pps.is_empty() {
            return Err(DaylapseError::mux(
                "track format carries no SPS/PPS parameter sets",
            ));
        }
        self.state = State::TrackAdded(format.clone());
        Ok(TrackId(0))
    }

    fn start(&mut self) -> DaylapseResult<()> {
        let format = match std::mem::replace(&mut self.state, State::Idle) {
            State::TrackAdded(format) => format,
            other => {
                self.state = other;
                return Err(DaylapseError::mux("mp4 muxer started without a track"));
            }
        };

        crate::encode::ffmpeg::ensure_parent_dir(&self.path)?;
        let file = File::create(&self.path).map_err(|e| {
            DaylapseError::mux(format!("create '{}': {e}", self.path.display()))
        })?;
        let codec = match format.codec {
            VideoCodec::H264 => MuxideCodec::H264,
        };
        let inner = MuxerBuilder::new(file)
            .video(
                codec,
                format.width,
                format.height,
                f64::from(format.frame_rate),
            )
            .build()
            .map_err(|e| DaylapseError::mux(format!("build mp4 muxer: {e}")))?;

        tracing::debug!(path = %self.path.display(), width = format.width, height = format.height, "mp4 muxer started");
        self.state = State::Started(inner);
        Ok(())
    }

    fn write_sample(&mut self, track: TrackId, buffer: &OutputBuffer) -> DaylapseResult<()> {
        if track != TrackId(0) {
            return Err(DaylapseError::mux(format!("unknown track {}", track.0)));
        }
        let State::Started(inner) = &mut self.state else {
            return Err(DaylapseError::mux("sample written while the muxer is not started"));
        };
        let pts_secs = buffer.presentation_time_us as f64 / 1_000_000.0;
        inner
            .write_video(pts_secs, &buffer.data, buffer.flags.key_frame)
            .map_err(|e| {
                DaylapseError::mux(format!(
                    "write sample at {} us: {e}",
                    buffer.presentation_time_us
                ))
            })?;
        self.samples += 1;
        Ok(())
    }

    fn stop(&mut self) -> DaylapseResult<()> {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Started(inner) => {
                inner
                    .finish_with_stats()
                    .map_err(|e| DaylapseError::mux(format!("finalize mp4: {e}")))?;
                tracing::debug!(samples = self.samples, "mp4 muxer finalized");
                Ok(())
            }
            other => {
                self.state = other;
                Err(DaylapseError::mux("mp4 muxer stopped before it was started"))
            }
        }
    }

    fn release(&mut self) {
        // Dropping an unfinished muxide writer leaves a truncated file; the owner removes it.
        self.state = State::Released;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mux/mp4.rs"]
mod tests;
