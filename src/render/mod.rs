//! Surface renderers: draw frames into the encoder's input surface.

/// CPU reference renderer.
pub mod cpu;
/// `wgpu` renderer.
#[cfg(feature = "gpu")]
pub mod gpu;
/// Renderer trait and presentation clock.
pub mod surface;
