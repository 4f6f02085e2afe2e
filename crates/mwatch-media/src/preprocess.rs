//! Frame preprocessing.
//!
//! Every raw frame becomes a fixed-width color frame for display and
//! annotation plus a smoothed grayscale copy for the background model.
//! Fixing the width bounds per-frame cost and keeps area thresholds
//! meaningful across cameras.

use image::imageops::{self, FilterType};
use imageproc::filter::gaussian_blur_f32;

use crate::error::{MediaError, MediaResult};
use crate::{Frame, GrayFrame};

/// Preprocessing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    /// Output width in pixels (height follows the aspect ratio)
    pub target_width: u32,
    /// Gaussian sigma for the analysis frame; 0 disables smoothing
    pub blur_sigma: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: 600,
            blur_sigma: 3.5,
        }
    }
}

/// Output of [`Preprocessor::process`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Resized color frame
    pub display: Frame,
    /// Grayscale, smoothed frame at the same size as `display`
    pub gray: GrayFrame,
}

/// Converts raw frames into display and analysis frames.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Resize, grayscale and smooth a raw frame.
    pub fn process(&self, raw: &Frame) -> MediaResult<Preprocessed> {
        let (width, height) = raw.dimensions();
        if width == 0 || height == 0 {
            return Err(MediaError::invalid_frame(format!("empty frame {}x{}", width, height)));
        }

        let display = self.resize(raw);
        let gray = imageops::grayscale(&display);
        let gray = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, self.config.blur_sigma)
        } else {
            gray
        };

        Ok(Preprocessed { display, gray })
    }

    fn resize(&self, raw: &Frame) -> Frame {
        let (width, height) = raw.dimensions();
        let target_width = self.config.target_width.max(1);
        if width == target_width {
            return raw.clone();
        }

        let target_height =
            ((height as f64 * target_width as f64 / width as f64).round() as u32).max(1);
        imageops::resize(raw, target_width, target_height, FilterType::Triangle)
    }
}
