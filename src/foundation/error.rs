/// Convenience result type used across daylapse.
pub type DaylapseResult<T> = Result<T, DaylapseError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Every variant is fatal to the request that produced it. Per-frame inference failures are a
/// separate, non-fatal type: [`crate::InferenceFailure`].
#[derive(thiserror::Error, Debug)]
pub enum DaylapseError {
    /// Invalid user-provided configuration or request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A frame with zero area or a mismatched shape reached a stage that cannot accept it.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The encoder announced a second output format after the muxer track was registered.
    #[error("encoder output format changed after the muxer track was registered")]
    FormatRenegotiation,

    /// The encoder delivered an encoded buffer before announcing its output format.
    #[error("encoder delivered a buffer before the muxer track was registered")]
    BufferBeforeTrack,

    /// A rendering context, encoder or muxer could not be created or configured.
    #[error("resource acquisition failed: {0}")]
    ResourceAcquisition(String),

    /// Errors raised by the video encoder while running.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors raised by the container muxer while running.
    #[error("mux error: {0}")]
    Mux(String),

    /// Errors raised by a surface renderer while drawing.
    #[error("render error: {0}")]
    Render(String),

    /// Strict requests fail when inference dropped some scheduled frames.
    #[error("requested {requested} frames but only {produced} were generated")]
    FrameCountMismatch {
        /// Number of frames the request scheduled.
        requested: usize,
        /// Number of frames that survived inference.
        produced: usize,
    },

    /// The caller cancelled the request between frames.
    #[error("render cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DaylapseError {
    /// Build a [`DaylapseError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DaylapseError::InvalidFrame`] value.
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    /// Build a [`DaylapseError::ResourceAcquisition`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceAcquisition(msg.into())
    }

    /// Build a [`DaylapseError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`DaylapseError::Mux`] value.
    pub fn mux(msg: impl Into<String>) -> Self {
        Self::Mux(msg.into())
    }

    /// Build a [`DaylapseError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Return `true` for encoder/muxer protocol violations.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::FormatRenegotiation | Self::BufferBeforeTrack)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
