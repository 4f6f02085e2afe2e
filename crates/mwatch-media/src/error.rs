//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while acquiring or processing frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {0}")]
    FfmpegFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Capture device error: {0}")]
    Capture(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Frame encode failed: {0}")]
    Encode(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(message: impl Into<String>) -> Self {
        Self::FfmpegFailed(message.into())
    }

    /// Create a capture device error.
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    /// Create an invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }

    /// Whether the error means the source has nothing more to give.
    ///
    /// Undecodable frames end the input rather than the process.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, MediaError::Decode(_) | MediaError::InvalidFrame(_))
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => MediaError::Io(e),
            other => MediaError::Decode(other.to_string()),
        }
    }
}
