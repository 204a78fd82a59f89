use crate::encode::codec::{OutputBuffer, TrackFormat};
use crate::foundation::error::DaylapseResult;

/// Handle of a track registered with [`Muxer::add_track`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

/// Container writer with explicit track negotiation.
///
/// Protocol: `add_track` (once per track), `start`, any number of `write_sample`, `stop`,
/// `release`. Samples written before `start` or after `stop` are errors. `release` is valid in
/// every state; the output is only valid if `stop` succeeded first.
pub trait Muxer: Send {
    /// Register a track for `format`.
    fn add_track(&mut self, format: &TrackFormat) -> DaylapseResult<TrackId>;
    /// Begin writing the container.
    fn start(&mut self) -> DaylapseResult<()>;
    /// Append one encoded sample to `track`.
    fn write_sample(&mut self, track: TrackId, buffer: &OutputBuffer) -> DaylapseResult<()>;
    /// Finalize the container.
    fn stop(&mut self) -> DaylapseResult<()>;
    /// Free every resource. Later calls are no-ops.
    fn release(&mut self);
}
