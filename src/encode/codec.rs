use std::time::Duration;

use bytes::Bytes;

use crate::foundation::config::{EncoderConfig, VideoCodec};
use crate::foundation::error::{DaylapseError, DaylapseResult};

/// Parameters handed to [`VideoEncoder::configure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderFormat {
    /// Output codec.
    pub codec: VideoCodec,
    /// Frame width in pixels (even).
    pub width: u32,
    /// Frame height in pixels (even).
    pub height: u32,
    /// Frames per second.
    pub frame_rate: u32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    /// Keyframe distance in frames.
    pub gop_size: u32,
}

impl EncoderFormat {
    /// Derive the encoder format for `width x height` frames from `cfg`.
    pub fn from_config(cfg: &EncoderConfig, width: u32, height: u32) -> Self {
        Self {
            codec: cfg.codec,
            width,
            height,
            frame_rate: cfg.frame_rate,
            bitrate: cfg.bitrate,
            gop_size: cfg.gop_size(),
        }
    }

    /// Reject zero sizes, odd sizes and zero rates.
    pub fn validate(&self) -> DaylapseResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DaylapseError::validation(
                "encoder width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(DaylapseError::validation(
                "encoder width/height must be even (required for yuv420p output)",
            ));
        }
        if self.frame_rate == 0 || self.bitrate == 0 || self.gop_size == 0 {
            return Err(DaylapseError::validation(
                "encoder frame_rate, bitrate and gop_size must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Output track description announced once by the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackFormat {
    /// Codec of the samples.
    pub codec: VideoCodec,
    /// Coded width.
    pub width: u32,
    /// Coded height.
    pub height: u32,
    /// Nominal frame rate.
    pub frame_rate: u32,
    /// Sequence parameter set NAL (no start code).
    pub sps: Bytes,
    /// Picture parameter set NAL (no start code).
    pub pps: Bytes,
}

/// Flags attached to an encoded buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// The buffer starts a keyframe (IDR).
    pub key_frame: bool,
    /// Last buffer of the stream; the payload may be empty.
    pub end_of_stream: bool,
}

/// One encoded access unit lent out by the encoder until [`VideoEncoder::release_output`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputBuffer {
    /// Slot index to hand back to the encoder.
    pub index: usize,
    /// Annex B payload.
    pub data: Bytes,
    /// Presentation time in microseconds.
    pub presentation_time_us: u64,
    /// Keyframe / end-of-stream flags.
    pub flags: BufferFlags,
}

/// Result of one output poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderOutput {
    /// Nothing became available within the timeout.
    TryAgainLater,
    /// The encoder settled its output format.
    FormatChanged(TrackFormat),
    /// An encoded buffer is ready.
    Buffer(OutputBuffer),
}

/// Encoder input surface: the rendering side writes whole RGBA frames into it.
pub trait InputSurface: Send {
    /// Surface width in pixels.
    fn width(&self) -> u32;
    /// Surface height in pixels.
    fn height(&self) -> u32;
    /// Submit one tightly packed RGBA8 frame with its presentation time in nanoseconds.
    fn queue_frame(&mut self, rgba: &[u8], presentation_time_ns: u64) -> DaylapseResult<()>;
    /// Detach from the encoder. Later calls are no-ops.
    fn release(&mut self);
}

/// A stateful video encoder with asynchronous output buffers.
///
/// Call order: `configure`, `create_input_surface`, `start`, then any number of frames and
/// `dequeue_output`/`release_output` rounds, then `signal_end_of_input`, a final drain, `stop`
/// and `release`. `release` is valid in every state.
pub trait VideoEncoder: Send {
    /// Human-readable encoder name for logs.
    fn name(&self) -> &str;
    /// Apply output parameters.
    fn configure(&mut self, format: &EncoderFormat) -> DaylapseResult<()>;
    /// Create the surface frames are rendered into.
    fn create_input_surface(&mut self) -> DaylapseResult<Box<dyn InputSurface>>;
    /// Start encoding.
    fn start(&mut self) -> DaylapseResult<()>;
    /// Wait up to `timeout` for the next output event.
    fn dequeue_output(&mut self, timeout: Duration) -> DaylapseResult<EncoderOutput>;
    /// Hand an output buffer back.
    fn release_output(&mut self, index: usize) -> DaylapseResult<()>;
    /// No more frames will be queued.
    fn signal_end_of_input(&mut self) -> DaylapseResult<()>;
    /// Stop encoding and report how the encoder finished.
    fn stop(&mut self) -> DaylapseResult<()>;
    /// Free every resource. Later calls are no-ops.
    fn release(&mut self);
}

/// Presentation time of frame `index` at `frame_rate`, in microseconds.
pub fn presentation_time_us(index: u64, frame_rate: u32) -> u64 {
    if frame_rate == 0 {
        return 0;
    }
    index * 1_000_000 / u64::from(frame_rate)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
