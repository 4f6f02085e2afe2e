//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use mwatch_media::{
    BackgroundParams, FfmpegFrameSource, FrameSource, MotionConfig, PreprocessConfig,
};
use mwatch_models::RearmPolicy;
use tracing::{info, warn};

use crate::error::WorkerResult;

/// Default alarm player invocation.
pub const DEFAULT_ALARM_COMMAND: &str = "mpg321 --stereo alarm.mp3";

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Detection pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Width frames are resized to before analysis
    pub frame_width: u32,
    /// Gaussian sigma applied to the analysis frame
    pub blur_sigma: f32,
    /// Smallest region area that counts as motion
    pub min_area: f64,
    /// Erosion passes over the foreground mask
    pub erode_iterations: u8,
    /// Background model history in frames
    pub history: u32,
    /// Background model match threshold
    pub var_threshold: f32,
    /// Draw region outlines and the status marker on published frames
    pub annotate: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            frame_width: 600,
            blur_sigma: 3.5,
            min_area: 600.0,
            erode_iterations: 2,
            history: 500,
            var_threshold: 16.0,
            annotate: true,
        }
    }
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frame_width: env_parse("DETECTOR_FRAME_WIDTH").unwrap_or(defaults.frame_width),
            blur_sigma: env_parse("DETECTOR_BLUR_SIGMA").unwrap_or(defaults.blur_sigma),
            min_area: env_parse("DETECTOR_MIN_AREA").unwrap_or(defaults.min_area),
            erode_iterations: env_parse("DETECTOR_ERODE_ITERATIONS")
                .unwrap_or(defaults.erode_iterations),
            history: env_parse("DETECTOR_HISTORY").unwrap_or(defaults.history),
            var_threshold: env_parse("DETECTOR_VAR_THRESHOLD").unwrap_or(defaults.var_threshold),
            annotate: env_parse("DETECTOR_ANNOTATE").unwrap_or(defaults.annotate),
        }
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            target_width: self.frame_width,
            blur_sigma: self.blur_sigma,
        }
    }

    pub fn motion_config(&self) -> MotionConfig {
        MotionConfig {
            min_area: self.min_area,
            erode_iterations: self.erode_iterations,
            background: BackgroundParams {
                history: self.history,
                var_threshold: self.var_threshold,
                ..BackgroundParams::default()
            },
        }
    }
}

/// Alarm timing and playback configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmConfig {
    /// Minimum gap between two alarms
    pub cooldown: Duration,
    /// How long the controller stays armed once armed
    pub activation_window: Duration,
    /// What renews the activation window
    pub rearm: RearmPolicy,
    /// Player command line; empty disables playback
    pub command: String,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(5),
            activation_window: Duration::from_secs(30),
            rearm: RearmPolicy::default(),
            command: DEFAULT_ALARM_COMMAND.to_string(),
        }
    }
}

impl AlarmConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rearm = match std::env::var("ALARM_REARM") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring ALARM_REARM, using default policy");
                defaults.rearm
            }),
            Err(_) => defaults.rearm,
        };

        Self {
            cooldown: Duration::from_secs(
                env_parse("ALARM_COOLDOWN_SECS").unwrap_or(defaults.cooldown.as_secs()),
            ),
            activation_window: Duration::from_secs(
                env_parse("ALARM_ACTIVATION_SECS").unwrap_or(defaults.activation_window.as_secs()),
            ),
            rearm,
            command: std::env::var("ALARM_COMMAND").unwrap_or(defaults.command),
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// Video file (or URL) decoded by ffmpeg
    File { path: PathBuf, realtime: bool },
    /// V4L2 capture device decoded by ffmpeg
    Device(String),
    /// OpenCV camera index
    Camera(i32),
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self::Device("/dev/video0".to_string())
    }
}

impl SourceSpec {
    /// `VIDEO_SOURCE` holds a file path or a `/dev/video*` device.
    pub fn from_env() -> Self {
        match std::env::var("VIDEO_SOURCE") {
            Ok(value) if value.starts_with("/dev/") => Self::Device(value),
            Ok(value) if !value.is_empty() => Self::File {
                path: PathBuf::from(value),
                realtime: env_parse("VIDEO_REALTIME").unwrap_or(false),
            },
            _ => Self::default(),
        }
    }

    /// Open the described source.
    pub fn open(&self) -> WorkerResult<Box<dyn FrameSource>> {
        let source: Box<dyn FrameSource> = match self {
            Self::File { path, realtime } => Box::new(FfmpegFrameSource::file(path, *realtime)?),
            Self::Device(device) => Box::new(FfmpegFrameSource::device(device.as_str())?),
            #[cfg(feature = "opencv")]
            Self::Camera(index) => Box::new(mwatch_media::CaptureFrameSource::camera(*index)?),
            #[cfg(not(feature = "opencv"))]
            Self::Camera(index) => {
                return Err(crate::error::WorkerError::config_error(format!(
                    "Camera index {index} requires the opencv feature"
                )))
            }
        };
        info!(source = %source.describe(), "Frame source opened");
        Ok(source)
    }
}

/// Everything the detection side needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerConfig {
    pub source: SourceSpec,
    pub detector: DetectorConfig,
    pub alarm: AlarmConfig,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            source: SourceSpec::from_env(),
            detector: DetectorConfig::from_env(),
            alarm: AlarmConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;

    #[test]
    fn test_detector_defaults_map_to_media_configs() {
        let config = DetectorConfig::default();

        let pre = config.preprocess_config();
        assert_eq!(pre, PreprocessConfig::default());

        let motion = config.motion_config();
        assert_eq!(motion.min_area, 600.0);
        assert_eq!(motion.erode_iterations, 2);
        assert_eq!(motion.background, BackgroundParams::default());
    }

    #[test]
    fn test_detector_overrides_reach_background_params() {
        let config = DetectorConfig {
            history: 50,
            var_threshold: 9.0,
            ..DetectorConfig::default()
        };
        let motion = config.motion_config();
        assert_eq!(motion.background.history, 50);
        assert_eq!(motion.background.var_threshold, 9.0);
        assert_eq!(motion.background.max_modes, 3);
    }

    #[test]
    fn test_alarm_defaults() {
        let config = AlarmConfig::default();
        assert_eq!(config.cooldown, Duration::from_secs(5));
        assert_eq!(config.activation_window, Duration::from_secs(30));
        assert_eq!(config.rearm, RearmPolicy::Continuous);
        assert_eq!(config.command, DEFAULT_ALARM_COMMAND);
    }

    #[test]
    fn test_default_source_is_first_device() {
        assert_eq!(SourceSpec::default(), SourceSpec::Device("/dev/video0".to_string()));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_camera_needs_opencv() {
        let err = SourceSpec::Camera(0).open().err().unwrap();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_source() {
        let spec = SourceSpec::File {
            path: PathBuf::from("/nonexistent/mwatch/clip.mp4"),
            realtime: false,
        };
        assert!(spec.open().is_err());
    }
}
