use std::collections::HashSet;
use std::io::{Read, Write as _};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::encode::annexb::{AccessUnit, AccessUnitSplitter};
use crate::encode::codec::{
    BufferFlags, EncoderFormat, EncoderOutput, InputSurface, OutputBuffer, TrackFormat,
    VideoEncoder,
};
use crate::foundation::config::VideoCodec;
use crate::foundation::error::{DaylapseError, DaylapseResult};

/// Encoded units waiting for `dequeue_output`. The stdout reader blocks when this fills up.
const OUTPUT_QUEUE_DEPTH: usize = 64;
const READ_CHUNK: usize = 64 * 1024;

enum ReaderEvent {
    Format(TrackFormat),
    Unit {
        data: Bytes,
        presentation_time_us: u64,
        key_frame: bool,
    },
    EndOfStream,
    Failed(String),
}

type SharedStdin = Arc<Mutex<Option<ChildStdin>>>;

/// H.264 encoder that runs the system `ffmpeg` with libx264.
///
/// Raw RGBA frames go in through stdin and an Annex B elementary stream comes back on stdout.
/// A reader thread cuts the stream into access units (ffmpeg is asked to insert delimiters) and
/// queues them with the presentation times recorded by the input surface.
pub struct FfmpegEncoder {
    format: Option<EncoderFormat>,
    stdin: SharedStdin,
    pts_rx: Option<Receiver<u64>>,
    surface_created: bool,

    child: Option<Child>,
    events: Option<Receiver<ReaderEvent>>,
    reader: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    next_index: usize,
    outstanding: HashSet<usize>,
    eos_delivered: bool,
    released: bool,
}

impl FfmpegEncoder {
    /// Create an unconfigured encoder.
    pub fn new() -> Self {
        Self {
            format: None,
            stdin: Arc::new(Mutex::new(None)),
            pts_rx: None,
            surface_created: false,
            child: None,
            events: None,
            reader: None,
            stderr_drain: None,
            next_index: 0,
            outstanding: HashSet::new(),
            eos_delivered: false,
            released: false,
        }
    }

    fn command(format: &EncoderFormat) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", format.width, format.height),
            "-r",
            &format.frame_rate.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-tune",
            "zerolatency",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            &format.bitrate.to_string(),
            "-maxrate",
            &format.bitrate.to_string(),
            "-bufsize",
            &(u64::from(format.bitrate) * 2).to_string(),
            "-g",
            &format.gop_size.to_string(),
            "-keyint_min",
            &format.gop_size.to_string(),
            "-sc_threshold",
            "0",
            "-bf",
            "0",
            "-bsf:v",
            "h264_metadata=aud=insert",
            "-f",
            "h264",
            "pipe:1",
        ]);
        cmd
    }

    fn close_input(&self) {
        drop(self.stdin.lock().take());
    }

    fn join_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Some(Ok(Err(e))) => format!("<stderr read failed: {e}>"),
            Some(Err(_)) => "<stderr drain thread panicked>".to_string(),
            None => String::new(),
        }
    }

    fn join_reader(&mut self) -> DaylapseResult<()> {
        if let Some(handle) = self.reader.take() {
            handle
                .join()
                .map_err(|_| DaylapseError::encode("ffmpeg stdout reader thread panicked"))?;
        }
        Ok(())
    }

    fn take_output_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.outstanding.insert(index);
        index
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg/libx264"
    }

    fn configure(&mut self, format: &EncoderFormat) -> DaylapseResult<()> {
        if self.child.is_some() || self.released {
            return Err(DaylapseError::encode("configure after start"));
        }
        format.validate()?;
        match format.codec {
            VideoCodec::H264 => {}
        }
        if !is_ffmpeg_on_path() {
            return Err(DaylapseError::resource(
                "ffmpeg is required for H.264 encoding, but was not found on PATH",
            ));
        }
        self.format = Some(format.clone());
        Ok(())
    }

    fn create_input_surface(&mut self) -> DaylapseResult<Box<dyn InputSurface>> {
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| DaylapseError::encode("input surface requested before configure"))?;
        if self.surface_created || self.child.is_some() {
            return Err(DaylapseError::encode(
                "input surface must be created once, before start",
            ));
        }
        let (pts_tx, pts_rx) = crossbeam_channel::unbounded();
        self.pts_rx = Some(pts_rx);
        self.surface_created = true;
        Ok(Box::new(FfmpegSurface {
            width: format.width,
            height: format.height,
            stdin: Arc::clone(&self.stdin),
            pts_tx: Some(pts_tx),
        }))
    }

    #[tracing::instrument(skip(self))]
    fn start(&mut self) -> DaylapseResult<()> {
        let format = self
            .format
            .clone()
            .ok_or_else(|| DaylapseError::encode("start before configure"))?;
        if self.child.is_some() {
            return Err(DaylapseError::encode("encoder already started"));
        }
        let pts_rx = self
            .pts_rx
            .take()
            .ok_or_else(|| DaylapseError::encode("start before the input surface was created"))?;

        let mut child = Self::command(&format).spawn().map_err(|e| {
            DaylapseError::resource(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(stdout), Some(mut stderr)) = (stdin, stdout, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DaylapseError::resource("failed to open ffmpeg pipes (unexpected)"));
        };

        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let (events_tx, events_rx) = crossbeam_channel::bounded(OUTPUT_QUEUE_DEPTH);
        let template = TrackFormat {
            codec: format.codec,
            width: format.width,
            height: format.height,
            frame_rate: format.frame_rate,
            sps: Bytes::new(),
            pps: Bytes::new(),
        };
        let reader = std::thread::spawn(move || read_stdout(stdout, pts_rx, events_tx, template));

        *self.stdin.lock() = Some(stdin);
        self.child = Some(child);
        self.events = Some(events_rx);
        self.reader = Some(reader);
        self.stderr_drain = Some(stderr_drain);
        tracing::debug!(
            width = format.width,
            height = format.height,
            fps = format.frame_rate,
            gop = format.gop_size,
            "ffmpeg encoder started"
        );
        Ok(())
    }

    fn dequeue_output(&mut self, timeout: Duration) -> DaylapseResult<EncoderOutput> {
        if self.eos_delivered {
            return Err(DaylapseError::encode("output dequeued after end of stream"));
        }
        let events = self
            .events
            .as_ref()
            .ok_or_else(|| DaylapseError::encode("output dequeued before start"))?;

        let event = match events.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(EncoderOutput::TryAgainLater),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DaylapseError::encode(
                    "ffmpeg output ended without an end-of-stream marker",
                ));
            }
        };

        match event {
            ReaderEvent::Format(format) => Ok(EncoderOutput::FormatChanged(format)),
            ReaderEvent::Unit {
                data,
                presentation_time_us,
                key_frame,
            } => Ok(EncoderOutput::Buffer(OutputBuffer {
                index: self.take_output_index(),
                data,
                presentation_time_us,
                flags: BufferFlags {
                    key_frame,
                    end_of_stream: false,
                },
            })),
            ReaderEvent::EndOfStream => {
                self.eos_delivered = true;
                Ok(EncoderOutput::Buffer(OutputBuffer {
                    index: self.take_output_index(),
                    data: Bytes::new(),
                    presentation_time_us: 0,
                    flags: BufferFlags {
                        key_frame: false,
                        end_of_stream: true,
                    },
                }))
            }
            ReaderEvent::Failed(msg) => Err(DaylapseError::encode(msg)),
        }
    }

    fn release_output(&mut self, index: usize) -> DaylapseResult<()> {
        if !self.outstanding.remove(&index) {
            return Err(DaylapseError::encode(format!(
                "output buffer {index} is not held by the caller"
            )));
        }
        Ok(())
    }

    fn signal_end_of_input(&mut self) -> DaylapseResult<()> {
        if self.child.is_none() {
            return Err(DaylapseError::encode("end of input signalled before start"));
        }
        self.close_input();
        tracing::debug!("ffmpeg stdin closed");
        Ok(())
    }

    fn stop(&mut self) -> DaylapseResult<()> {
        self.close_input();
        // Unblocks the reader if output was abandoned mid-stream.
        self.events = None;
        let mut child = self
            .child
            .take()
            .ok_or_else(|| DaylapseError::encode("encoder stopped before start"))?;
        let status = child
            .wait()
            .map_err(|e| DaylapseError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        self.join_reader()?;
        let stderr = self.join_stderr();

        if !status.success() {
            return Err(DaylapseError::encode(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        if !stderr.is_empty() {
            tracing::debug!(stderr = %stderr, "ffmpeg diagnostics");
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.close_input();
        self.events = None;
        self.pts_rx = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::trace!(error = %e, "ffmpeg already exited");
            }
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "failed to reap ffmpeg");
            }
        }
        if let Err(e) = self.join_reader() {
            tracing::warn!(error = %e, "ffmpeg reader teardown failed");
        }
        let _ = self.join_stderr();
        self.outstanding.clear();
        tracing::debug!("ffmpeg encoder released");
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.release();
    }
}

struct FfmpegSurface {
    width: u32,
    height: u32,
    stdin: SharedStdin,
    pts_tx: Option<Sender<u64>>,
}

impl InputSurface for FfmpegSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn queue_frame(&mut self, rgba: &[u8], presentation_time_ns: u64) -> DaylapseResult<()> {
        let expected = (self.width as usize) * (self.height as usize) * 4;
        if rgba.len() != expected {
            return Err(DaylapseError::validation(format!(
                "surface frame must be {expected} bytes, got {}",
                rgba.len()
            )));
        }
        let pts_tx = self
            .pts_tx
            .as_ref()
            .ok_or_else(|| DaylapseError::encode("input surface already released"))?;

        let mut stdin = self.stdin.lock();
        let Some(pipe) = stdin.as_mut() else {
            return Err(DaylapseError::encode("encoder is not accepting input"));
        };
        // Queue the timestamp first so the reader always finds it when the unit comes out.
        pts_tx
            .send(presentation_time_ns / 1_000)
            .map_err(|_| DaylapseError::encode("ffmpeg output reader has exited"))?;
        pipe.write_all(rgba)
            .map_err(|e| DaylapseError::encode(format!("failed to write frame to ffmpeg stdin: {e}")))?;
        Ok(())
    }

    fn release(&mut self) {
        self.pts_tx = None;
    }
}

fn read_stdout(
    mut stdout: ChildStdout,
    pts_rx: Receiver<u64>,
    events: Sender<ReaderEvent>,
    template: TrackFormat,
) {
    let mut splitter = AccessUnitSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut announced = false;

    let mut emit = |unit: AccessUnit| -> bool {
        if !announced {
            let (Some(sps), Some(pps)) = (unit.sps.clone(), unit.pps.clone()) else {
                let _ = events.send(ReaderEvent::Failed(
                    "first access unit carries no SPS/PPS".to_string(),
                ));
                return false;
            };
            let format = TrackFormat {
                sps,
                pps,
                ..template.clone()
            };
            if events.send(ReaderEvent::Format(format)).is_err() {
                return false;
            }
            announced = true;
        }
        let Ok(presentation_time_us) = pts_rx.recv() else {
            let _ = events.send(ReaderEvent::Failed(
                "ffmpeg produced more access units than frames were queued".to_string(),
            ));
            return false;
        };
        events
            .send(ReaderEvent::Unit {
                data: unit.data,
                presentation_time_us,
                key_frame: unit.key_frame,
            })
            .is_ok()
    };

    loop {
        let n = match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = events.send(ReaderEvent::Failed(format!("ffmpeg stdout read failed: {e}")));
                return;
            }
        };
        for unit in splitter.push(&buf[..n]) {
            if !emit(unit) {
                return;
            }
        }
    }
    if let Some(unit) = splitter.finish()
        && !emit(unit)
    {
        return;
    }
    let _ = events.send(ReaderEvent::EndOfStream);
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> DaylapseResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
