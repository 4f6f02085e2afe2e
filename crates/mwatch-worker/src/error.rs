//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Sounder unavailable: {0}")]
    SounderUnavailable(String),

    #[error("Media error: {0}")]
    Media(#[from] mwatch_media::MediaError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn sounder_unavailable(msg: impl Into<String>) -> Self {
        Self::SounderUnavailable(msg.into())
    }

    /// Whether the error means the frame source is done rather than broken.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, WorkerError::Media(e) if e.is_end_of_input())
    }
}
