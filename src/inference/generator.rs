use crate::foundation::core::Frame;
use crate::foundation::math::{XorShift64, mix64};

/// A single frame the generator could not produce.
///
/// Not fatal: the pipeline logs it and moves on to the next scheduled frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("inference failed: {message}")]
pub struct InferenceFailure {
    message: String,
}

impl InferenceFailure {
    /// Wrap a failure description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Produces a low-resolution color frame for one point in the day.
///
/// `latent` is the noise vector for this frame and `model_time` is the fraction of a day in
/// `[0, 1)`. Implementations may hold mutable state such as a model session, which is why
/// `infer` takes `&mut self`.
pub trait FrameGenerator {
    /// Generate one color frame. The result must share the guide's aspect ratio.
    fn infer(
        &mut self,
        guide: &Frame,
        latent: &[f32],
        model_time: f32,
    ) -> Result<Frame, InferenceFailure>;
}

impl<G: FrameGenerator + ?Sized> FrameGenerator for Box<G> {
    fn infer(
        &mut self,
        guide: &Frame,
        latent: &[f32],
        model_time: f32,
    ) -> Result<Frame, InferenceFailure> {
        (**self).infer(guide, latent, model_time)
    }
}

/// Deterministic standard-normal noise vector.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentNoise {
    values: Vec<f32>,
}

impl LatentNoise {
    /// Draw `dim` samples from N(0, 1) using a generator seeded with `seed`.
    pub fn gaussian(seed: u64, dim: usize) -> Self {
        let mut rng = XorShift64::from_seed(seed);
        let mut values = Vec::with_capacity(dim);
        while values.len() < dim {
            let (a, b) = rng.next_gaussian_pair();
            values.push(a as f32);
            if values.len() < dim {
                values.push(b as f32);
            }
        }
        Self { values }
    }

    /// Noise for frame `index` of a request seeded with `seed`.
    ///
    /// Each frame gets its own stream, so skipping or reordering frames never changes the noise
    /// of the others.
    pub fn for_frame(seed: u64, index: usize, dim: usize) -> Self {
        Self::gaussian(mix64(seed ^ mix64(index as u64 + 1)), dim)
    }

    /// Borrow the samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` for a zero-dimensional latent.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/inference/generator.rs"]
mod tests;
