use crate::foundation::core::Frame;
use crate::foundation::error::{DaylapseError, DaylapseResult};

/// Draws frames into an encoder input surface.
///
/// Presentation times must strictly increase from one `draw` to the next. `release` tears the
/// renderer down in reverse acquisition order and detaches the surface; it is idempotent, and
/// `draw` after `release` is an error.
pub trait SurfaceRenderer: Send {
    /// Renderer name for logs.
    fn name(&self) -> &str;
    /// Draw `frame` as a full-surface quad and submit it with `presentation_time_us`.
    fn draw(&mut self, frame: &Frame, presentation_time_us: u64) -> DaylapseResult<()>;
    /// Free every resource. Later calls are no-ops.
    fn release(&mut self);
}

/// Tracks the last submitted presentation time.
#[derive(Clone, Copy, Debug, Default)]
pub struct PresentationClock {
    last_us: Option<u64>,
}

impl PresentationClock {
    /// Clock with no submissions yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `pts_us` if it is later than the previous one.
    pub fn advance(&mut self, pts_us: u64) -> DaylapseResult<()> {
        if let Some(last) = self.last_us
            && pts_us <= last
        {
            return Err(DaylapseError::validation(format!(
                "presentation time must increase (got {pts_us} us after {last} us)"
            )));
        }
        self.last_us = Some(pts_us);
        Ok(())
    }

    /// Last accepted time, if any.
    pub fn last_us(&self) -> Option<u64> {
        self.last_us
    }
}

/// Surface clock is in nanoseconds.
pub(crate) fn surface_time_ns(pts_us: u64) -> u64 {
    pts_us.saturating_mul(1_000)
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
