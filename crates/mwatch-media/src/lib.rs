//! Frame acquisition and motion detection primitives.
//!
//! This crate provides:
//! - Frame sources (FFmpeg pipe, in-memory, optional OpenCV capture)
//! - Preprocessing into display and analysis frames
//! - An adaptive mixture-of-Gaussians background model
//! - Region extraction with erosion and area filtering
//! - Region annotation and JPEG encoding for the stream

pub mod annotate;
pub mod background;
#[cfg(feature = "opencv")]
pub mod capture;
pub mod command;
pub mod encode;
pub mod error;
pub mod motion;
pub mod preprocess;
pub mod source;

pub use annotate::{draw_regions, draw_status_marker, REGION_COLOR};
pub use background::{BackgroundParams, MixtureBackground};
#[cfg(feature = "opencv")]
pub use capture::CaptureFrameSource;
pub use command::{check_ffmpeg, FfmpegCommand};
pub use encode::encode_jpeg;
pub use error::{MediaError, MediaResult};
pub use motion::{MotionConfig, MotionDetector};
pub use preprocess::{PreprocessConfig, Preprocessed, Preprocessor};
pub use source::{FfmpegFrameSource, FrameSource, MemoryFrameSource};

/// Color frame as delivered by a source and shown to stream clients.
pub type Frame = image::RgbImage;

/// Single-channel frame used for background modeling.
pub type GrayFrame = image::GrayImage;
