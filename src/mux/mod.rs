//! Container muxing.

/// MP4 muxer backed by `muxide`.
pub mod mp4;
/// Muxer trait and track handles.
pub mod muxer;
