//! Video encoding: encoder abstraction, drain loop and the streaming writer.

pub(crate) mod annexb;
/// Factory for encoder, muxer and renderer.
pub mod backend;
/// Encoder-side types and traits.
pub mod codec;
/// Encoder output drain and muxer track negotiation.
pub mod drain;
/// System `ffmpeg` H.264 encoder.
pub mod ffmpeg;
/// Streaming frames-to-MP4 session.
pub mod writer;
