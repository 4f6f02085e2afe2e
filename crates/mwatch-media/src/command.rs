//! FFmpeg command builder for decoding an input into a frame pipe.

use std::path::PathBuf;

use crate::error::{MediaError, MediaResult};

/// Builder for an FFmpeg invocation that decodes `input` and writes a
/// stream of binary PPM images to stdout.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path, URL or device node
    input: String,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i, before the pipe target)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Force the input demuxer (e.g. `v4l2` for a capture device).
    pub fn input_format(self, format: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg(format)
    }

    /// Read the input at its native frame rate instead of as fast as possible.
    pub fn realtime(self) -> Self {
        self.input_arg("-re")
    }

    /// Cap the output frame rate.
    pub fn fps(self, fps: u32) -> Self {
        self.output_arg("-vf").output_arg(format!("fps={}", fps))
    }

    /// The input this command decodes.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        // FFmpeg's stderr is inherited, so keep it to real errors.
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.clone());

        args.extend(self.output_args.clone());

        // Self-describing frames: every PPM carries its own width and height
        args.extend(
            ["-an", "-f", "image2pipe", "-c:v", "ppm", "-pix_fmt", "rgb24", "-"]
                .into_iter()
                .map(String::from),
        );

        args
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
