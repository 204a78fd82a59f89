use std::collections::VecDeque;

use bytes::Bytes;

use super::*;
use crate::encode::codec::{
    BufferFlags, EncoderFormat, InputSurface, OutputBuffer, TrackFormat,
};
use crate::foundation::config::VideoCodec;

#[derive(Default)]
struct ScriptedEncoder {
    script: VecDeque<EncoderOutput>,
    released: Vec<usize>,
}

impl ScriptedEncoder {
    fn new(script: Vec<EncoderOutput>) -> Self {
        Self {
            script: script.into(),
            released: Vec::new(),
        }
    }
}

impl VideoEncoder for ScriptedEncoder {
    fn name(&self) -> &str {
        "scripted"
    }
    fn configure(&mut self, _format: &EncoderFormat) -> DaylapseResult<()> {
        Ok(())
    }
    fn create_input_surface(&mut self) -> DaylapseResult<Box<dyn InputSurface>> {
        Err(DaylapseError::encode("not used"))
    }
    fn start(&mut self) -> DaylapseResult<()> {
        Ok(())
    }
    fn dequeue_output(&mut self, _timeout: Duration) -> DaylapseResult<EncoderOutput> {
        Ok(self
            .script
            .pop_front()
            .unwrap_or(EncoderOutput::TryAgainLater))
    }
    fn release_output(&mut self, index: usize) -> DaylapseResult<()> {
        self.released.push(index);
        Ok(())
    }
    fn signal_end_of_input(&mut self) -> DaylapseResult<()> {
        Ok(())
    }
    fn stop(&mut self) -> DaylapseResult<()> {
        Ok(())
    }
    fn release(&mut self) {}
}

#[derive(Default)]
struct RecordingMuxer {
    tracks: usize,
    started: bool,
    samples: Vec<u64>,
}

impl Muxer for RecordingMuxer {
    fn add_track(&mut self, _format: &TrackFormat) -> DaylapseResult<TrackId> {
        self.tracks += 1;
        Ok(TrackId(7))
    }
    fn start(&mut self) -> DaylapseResult<()> {
        self.started = true;
        Ok(())
    }
    fn write_sample(&mut self, track: TrackId, buffer: &OutputBuffer) -> DaylapseResult<()> {
        assert_eq!(track, TrackId(7));
        assert!(self.started);
        self.samples.push(buffer.presentation_time_us);
        Ok(())
    }
    fn stop(&mut self) -> DaylapseResult<()> {
        Ok(())
    }
    fn release(&mut self) {}
}

fn track_format() -> EncoderOutput {
    EncoderOutput::FormatChanged(TrackFormat {
        codec: VideoCodec::H264,
        width: 16,
        height: 16,
        frame_rate: 4,
        sps: Bytes::from_static(&[0x67]),
        pps: Bytes::from_static(&[0x68]),
    })
}

fn buffer(index: usize, pts: u64) -> EncoderOutput {
    EncoderOutput::Buffer(OutputBuffer {
        index,
        data: Bytes::from_static(&[0, 0, 0, 1, 0x65]),
        presentation_time_us: pts,
        flags: BufferFlags {
            key_frame: index == 0,
            end_of_stream: false,
        },
    })
}

fn eos(index: usize) -> EncoderOutput {
    EncoderOutput::Buffer(OutputBuffer {
        index,
        data: Bytes::new(),
        presentation_time_us: 0,
        flags: BufferFlags {
            key_frame: false,
            end_of_stream: true,
        },
    })
}

const T: Duration = Duration::from_millis(1);

#[test]
fn poll_stops_at_try_again_later() {
    let mut enc = ScriptedEncoder::new(vec![
        track_format(),
        buffer(0, 0),
        EncoderOutput::TryAgainLater,
        buffer(1, 250_000),
    ]);
    let mut mux = RecordingMuxer::default();
    let mut session = EncoderSession::new();

    drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Poll, T).unwrap();
    assert_eq!(session.track(), Some(TrackId(7)));
    assert!(session.muxer_started());
    assert_eq!(mux.samples, vec![0]);
    assert_eq!(enc.script.len(), 1);
}

#[test]
fn flush_runs_through_try_again_later_to_end_of_stream() {
    let mut enc = ScriptedEncoder::new(vec![
        track_format(),
        buffer(0, 0),
        EncoderOutput::TryAgainLater,
        buffer(1, 250_000),
        EncoderOutput::TryAgainLater,
        buffer(2, 500_000),
        eos(3),
    ]);
    let mut mux = RecordingMuxer::default();
    let mut session = EncoderSession::new();

    drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Flush, T).unwrap();
    assert!(session.is_finished());
    assert!(session.muxer_started());
    assert_eq!(session.track(), None);
    assert_eq!(mux.tracks, 1);
    assert_eq!(mux.samples, vec![0, 250_000, 500_000]);
    assert_eq!(session.samples_written(), 3);
    assert_eq!(session.presentation_clock_us(), 500_000);
    assert_eq!(enc.released, vec![0, 1, 2, 3]);

    // A finished session drains nothing further.
    drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Flush, T).unwrap();
}

#[test]
fn second_format_change_is_a_renegotiation_error() {
    let mut enc = ScriptedEncoder::new(vec![track_format(), buffer(0, 0), track_format()]);
    let mut mux = RecordingMuxer::default();
    let mut session = EncoderSession::new();
    let err = drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Flush, T).unwrap_err();
    assert!(matches!(err, DaylapseError::FormatRenegotiation));
    assert_eq!(mux.tracks, 1);
}

#[test]
fn buffer_before_format_is_rejected_and_still_released() {
    let mut enc = ScriptedEncoder::new(vec![buffer(4, 0)]);
    let mut mux = RecordingMuxer::default();
    let mut session = EncoderSession::new();
    let err = drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Poll, T).unwrap_err();
    assert!(matches!(err, DaylapseError::BufferBeforeTrack));
    assert_eq!(enc.released, vec![4]);
    assert!(mux.samples.is_empty());
    assert!(!session.muxer_started());
}

#[test]
fn end_of_stream_without_payload_needs_no_track() {
    let mut enc = ScriptedEncoder::new(vec![eos(0)]);
    let mut mux = RecordingMuxer::default();
    let mut session = EncoderSession::new();
    drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Flush, T).unwrap();
    assert!(session.is_finished());
    assert!(!session.muxer_started());
}

#[test]
fn regressing_timestamps_are_fatal() {
    let mut enc = ScriptedEncoder::new(vec![track_format(), buffer(0, 500_000), buffer(1, 250_000)]);
    let mut mux = RecordingMuxer::default();
    let mut session = EncoderSession::new();
    let err = drain_encoder(&mut enc, &mut mux, &mut session, DrainMode::Poll, T).unwrap_err();
    assert!(matches!(err, DaylapseError::Encode(_)));
    assert_eq!(enc.released, vec![0, 1]);
    assert_eq!(mux.samples, vec![500_000]);
}
