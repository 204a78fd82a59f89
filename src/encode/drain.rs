use std::time::Duration;

use crate::encode::codec::{EncoderOutput, VideoEncoder};
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::mux::muxer::{Muxer, TrackId};

/// Where the encoder/muxer handshake stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuxState {
    /// No output format seen yet; the muxer has no track.
    AwaitingFormat,
    /// Track registered and muxer started.
    Muxing {
        /// Track every sample goes to.
        track: TrackId,
    },
    /// End of stream reached.
    Finished,
}

/// How long [`drain_encoder`] keeps polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainMode {
    /// Return as soon as the encoder has nothing ready.
    Poll,
    /// Keep polling until end of stream.
    Flush,
}

/// Mutable state of one encode session.
#[derive(Clone, Debug)]
pub struct EncoderSession {
    state: MuxState,
    muxer_started: bool,
    presentation_clock_us: u64,
    samples_written: u64,
}

impl Default for EncoderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderSession {
    /// Fresh session awaiting the output format.
    pub fn new() -> Self {
        Self {
            state: MuxState::AwaitingFormat,
            muxer_started: false,
            presentation_clock_us: 0,
            samples_written: 0,
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> MuxState {
        self.state
    }

    /// Track handle once muxing.
    pub fn track(&self) -> Option<TrackId> {
        match self.state {
            MuxState::Muxing { track } => Some(track),
            _ => None,
        }
    }

    /// `true` once the muxer was started; it stays `true` after end of stream.
    pub fn muxer_started(&self) -> bool {
        self.muxer_started
    }

    /// Presentation time of the latest sample written.
    pub fn presentation_clock_us(&self) -> u64 {
        self.presentation_clock_us
    }

    /// Number of samples handed to the muxer.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// `true` after the end-of-stream buffer.
    pub fn is_finished(&self) -> bool {
        self.state == MuxState::Finished
    }
}

/// Move encoder output into the muxer.
///
/// The first format change registers the muxer track and starts the muxer; a second one is a
/// [`DaylapseError::FormatRenegotiation`]. Encoded buffers are written in delivery order and a
/// buffer that arrives before the format is a [`DaylapseError::BufferBeforeTrack`]. Every
/// dequeued buffer is handed back to the encoder, including one that triggered an error.
pub fn drain_encoder(
    encoder: &mut dyn VideoEncoder,
    muxer: &mut dyn Muxer,
    session: &mut EncoderSession,
    mode: DrainMode,
    timeout: Duration,
) -> DaylapseResult<()> {
    loop {
        if session.is_finished() {
            return Ok(());
        }
        match encoder.dequeue_output(timeout)? {
            EncoderOutput::TryAgainLater => match mode {
                DrainMode::Poll => return Ok(()),
                DrainMode::Flush => {
                    tracing::trace!("encoder busy, still flushing");
                    continue;
                }
            },
            EncoderOutput::FormatChanged(format) => {
                if session.state != MuxState::AwaitingFormat {
                    return Err(DaylapseError::FormatRenegotiation);
                }
                let track = muxer.add_track(&format)?;
                muxer.start()?;
                session.state = MuxState::Muxing { track };
                session.muxer_started = true;
                tracing::debug!(
                    track = track.0,
                    width = format.width,
                    height = format.height,
                    codec = format.codec.mime(),
                    "muxer track registered"
                );
            }
            EncoderOutput::Buffer(buffer) => {
                let index = buffer.index;
                let written = write_buffer(muxer, session, &buffer);
                let released = encoder.release_output(index);
                written?;
                released?;
            }
        }
    }
}

fn write_buffer(
    muxer: &mut dyn Muxer,
    session: &mut EncoderSession,
    buffer: &crate::encode::codec::OutputBuffer,
) -> DaylapseResult<()> {
    if !buffer.data.is_empty() {
        let MuxState::Muxing { track } = session.state else {
            return Err(DaylapseError::BufferBeforeTrack);
        };
        if buffer.presentation_time_us < session.presentation_clock_us {
            return Err(DaylapseError::encode(format!(
                "presentation time went from {} us to {} us",
                session.presentation_clock_us, buffer.presentation_time_us
            )));
        }
        muxer.write_sample(track, buffer)?;
        session.presentation_clock_us = buffer.presentation_time_us;
        session.samples_written += 1;
        tracing::trace!(
            pts_us = buffer.presentation_time_us,
            bytes = buffer.data.len(),
            key = buffer.flags.key_frame,
            "sample written"
        );
    }
    if buffer.flags.end_of_stream {
        session.state = MuxState::Finished;
        tracing::debug!(samples = session.samples_written, "encoder reached end of stream");
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/drain.rs"]
mod tests;
