//! Timelapse orchestration: schedule, generate, composite and encode.

pub(crate) mod timelapse;
