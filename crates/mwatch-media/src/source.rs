//! Frame sources.
//!
//! A source hands out decoded color frames until it runs dry. `Ok(None)`
//! is the end-of-input signal; finite inputs always end that way, live
//! devices only when the device goes away.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use image::codecs::pnm::PnmDecoder;
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::command::{check_ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::Frame;

/// Producer of raw video frames.
pub trait FrameSource: Send {
    /// Pull the next frame, blocking until one is available.
    fn next_frame(&mut self) -> MediaResult<Option<Frame>>;

    /// Human-readable label for logs.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Decodes any FFmpeg-readable input through a child process.
pub struct FfmpegFrameSource {
    label: String,
    child: Child,
    reader: BufReader<ChildStdout>,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Open a video file.
    pub fn file(path: impl AsRef<Path>, realtime: bool) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let mut cmd = FfmpegCommand::new(path.to_string_lossy());
        if realtime {
            cmd = cmd.realtime();
        }
        Self::spawn(cmd)
    }

    /// Open a V4L2 capture device such as `/dev/video0`.
    pub fn device(device: impl Into<String>) -> MediaResult<Self> {
        Self::spawn(FfmpegCommand::new(device).input_format("v4l2"))
    }

    /// Spawn FFmpeg for an arbitrary command.
    pub fn spawn(cmd: FfmpegCommand) -> MediaResult<Self> {
        let ffmpeg = check_ffmpeg()?;
        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout"))?;

        info!(input = %cmd.input(), "Opened FFmpeg frame source");

        Ok(Self {
            label: format!("ffmpeg:{}", cmd.input()),
            child,
            reader: BufReader::new(stdout),
            frames_read: 0,
        })
    }

    fn read_frame(&mut self) -> MediaResult<Frame> {
        let decoder = PnmDecoder::new(&mut self.reader)?;
        let frame = DynamicImage::from_decoder(decoder)?.into_rgb8();
        self.frames_read += 1;
        Ok(frame)
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        if self.reader.fill_buf()?.is_empty() {
            let status = self.child.wait()?;
            info!(
                frames = self.frames_read,
                exit_code = ?status.code(),
                "FFmpeg frame source exhausted"
            );
            return Ok(None);
        }

        match self.read_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(MediaError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!(frames = self.frames_read, "Truncated frame at end of input");
                Ok(None)
            }
            Err(e) if e.is_end_of_input() => {
                warn!(frames = self.frames_read, error = %e, "Undecodable frame, ending input");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Finite in-memory source, mostly for tests and replays.
#[derive(Debug, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
}

impl MemoryFrameSource {
    /// Create a source that yields the given frames in order.
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn describe(&self) -> String {
        format!("memory:{} frames", self.frames.len())
    }
}
