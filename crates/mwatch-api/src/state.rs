//! Application state.

use std::sync::Arc;

use tokio::sync::watch;

use mwatch_media::Frame;
use mwatch_worker::{FrameSlot, PipelineStatus, RearmSignal};

use crate::config::ApiConfig;

/// Shared application state.
///
/// The frame slot, status board and re-arm flag are the same instances the
/// detection loop was built with.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub frames: Arc<FrameSlot<Frame>>,
    pub status: Arc<PipelineStatus>,
    pub rearm: RearmSignal,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            frames: Arc::new(FrameSlot::new()),
            status: Arc::new(PipelineStatus::new()),
            rearm: RearmSignal::new(),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Receiver that flips to `true` once shutdown starts.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Tell the detection loop and open streams to finish.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
