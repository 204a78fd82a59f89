//! daylapse turns one still image into a short time-of-day timelapse video.
//!
//! The pipeline is frame-oriented:
//!
//! - [`schedule()`] a window of hours into per-frame model times
//! - ask a [`FrameGenerator`] for a low-resolution color frame and [`composite`] it over the guide
//! - draw each frame into the encoder surface and mux the H.264 stream into MP4 with
//!   [`VideoWriter`], or do everything in one call with [`render_timelapse`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod color;
/// Video encoding: encoder seam, drain loop and streaming writer.
pub mod encode;
pub(crate) mod inference;
/// Container muxing.
pub mod mux;
pub(crate) mod pipeline;
/// Surface renderers.
pub mod render;
pub(crate) mod schedule;

pub use crate::foundation::config::{
    ContainerFormat, EncoderConfig, PipelineConfig, TimelapseRequest, VideoCodec,
};
pub use crate::foundation::core::{CancelFlag, Frame};
pub use crate::foundation::error::{DaylapseError, DaylapseResult};

pub use crate::color::composite::composite;
pub use crate::color::lab::{lab_to_rgb8, rgb8_to_lab};
pub use crate::encode::backend::{MediaBackend, RendererKind, SystemBackend};
pub use crate::encode::writer::{EncodeSummary, VideoWriter, encode_frames};
pub use crate::inference::generator::{FrameGenerator, InferenceFailure, LatentNoise};
pub use crate::inference::grade::GradeGenerator;
pub use crate::inference::tensor::{chw_tensor_to_frame, frame_to_chw_tensor};
pub use crate::pipeline::timelapse::{
    RenderSummary, TimelapseFrame, TimelapseReport, generate_frames, render_timelapse,
    reorder_frames,
};
pub use crate::schedule::scheduler::{ScheduleEntry, TimeOfDay, schedule};
