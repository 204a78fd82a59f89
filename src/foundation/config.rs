use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{DaylapseError, DaylapseResult};

/// Video codec produced by the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 / AVC, Annex B elementary stream out of the encoder.
    #[default]
    H264,
}

impl VideoCodec {
    /// MIME type advertised by the encoder for this codec.
    pub fn mime(self) -> &'static str {
        match self {
            Self::H264 => "video/avc",
        }
    }
}

/// Output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// ISO base media file (`.mp4`).
    #[default]
    Mp4,
}

/// Encoder parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Output codec.
    pub codec: VideoCodec,
    /// Output container.
    pub container: ContainerFormat,
    /// Frames per second of the output video.
    pub frame_rate: u32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    /// Seconds between forced keyframes.
    pub keyframe_interval_secs: u32,
    /// Upper bound for one output poll while frames are still being fed, in microseconds.
    pub dequeue_timeout_us: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            container: ContainerFormat::Mp4,
            frame_rate: 4,
            bitrate: 2_000_000,
            keyframe_interval_secs: 1,
            dequeue_timeout_us: 10_000,
        }
    }
}

impl EncoderConfig {
    /// Reject zero rates, bitrates and intervals.
    pub fn validate(&self) -> DaylapseResult<()> {
        if self.frame_rate == 0 {
            return Err(DaylapseError::validation("encoder frame_rate must be non-zero"));
        }
        if self.bitrate == 0 {
            return Err(DaylapseError::validation("encoder bitrate must be non-zero"));
        }
        if self.keyframe_interval_secs == 0 {
            return Err(DaylapseError::validation(
                "encoder keyframe_interval_secs must be non-zero",
            ));
        }
        if self.dequeue_timeout_us == 0 {
            return Err(DaylapseError::validation(
                "encoder dequeue_timeout_us must be non-zero",
            ));
        }
        Ok(())
    }

    /// Keyframe distance in frames.
    pub fn gop_size(&self) -> u32 {
        self.frame_rate.saturating_mul(self.keyframe_interval_secs)
    }

    /// Poll timeout as a [`std::time::Duration`].
    pub fn dequeue_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_micros(self.dequeue_timeout_us)
    }
}

/// Parameters of one timelapse render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelapseRequest {
    /// Number of frames to schedule (at least 1).
    pub frame_count: usize,
    /// First hour of the window, `0..=23`.
    pub start_hour: u8,
    /// Last hour of the window, `0..=23`. Values at or before `start_hour` wrap past midnight.
    pub end_hour: u8,
    /// Weight of the guide lightness in the composite, `0.0..=1.0`.
    pub alpha: f32,
    /// Seed for the latent noise; frame `i` uses a seed derived from this and `i`.
    pub seed: u64,
    /// Fail the whole request when any frame could not be generated.
    pub require_all_frames: bool,
}

impl Default for TimelapseRequest {
    fn default() -> Self {
        Self {
            frame_count: 48,
            start_hour: 6,
            end_hour: 18,
            alpha: 0.5,
            seed: 0,
            require_all_frames: false,
        }
    }
}

impl TimelapseRequest {
    /// Check ranges of every field.
    pub fn validate(&self) -> DaylapseResult<()> {
        if self.frame_count == 0 {
            return Err(DaylapseError::validation("frame_count must be at least 1"));
        }
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(DaylapseError::validation(format!(
                "hours must be in 0..=23 (got start={}, end={})",
                self.start_hour, self.end_hour
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(DaylapseError::validation(format!(
                "alpha must be in [0, 1] (got {})",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Pipeline-wide configuration, usually loaded from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Encoder parameters.
    pub encoder: EncoderConfig,
    /// Side of the square guide image, in pixels.
    pub guide_size: u32,
    /// Side of the square image the generator consumes and produces.
    pub inference_size: u32,
    /// Length of the latent noise vector.
    pub latent_dim: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            guide_size: 512,
            inference_size: 128,
            latent_dim: 128,
        }
    }
}

impl PipelineConfig {
    /// Parse a config from a JSON reader. Missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> DaylapseResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| DaylapseError::validation(format!("parse pipeline config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> DaylapseResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            DaylapseError::validation(format!("open pipeline config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Validate the encoder section and the image sizes.
    pub fn validate(&self) -> DaylapseResult<()> {
        self.encoder.validate()?;
        if self.guide_size == 0 || self.inference_size == 0 {
            return Err(DaylapseError::validation(
                "guide_size and inference_size must be non-zero",
            ));
        }
        if self.latent_dim == 0 {
            return Err(DaylapseError::validation("latent_dim must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
