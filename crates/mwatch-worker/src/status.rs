//! Shared pipeline status for the status endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use mwatch_models::DetectionSummary;

/// Written once per frame by the detection loop, read by HTTP handlers.
#[derive(Debug, Default)]
pub struct PipelineStatus {
    summary: RwLock<DetectionSummary>,
    stream_clients: AtomicU64,
}

impl PipelineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DetectionSummary {
        let mut summary = self
            .summary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        summary.stream_clients = self.stream_clients();
        summary
    }

    pub fn update(&self, f: impl FnOnce(&mut DetectionSummary)) {
        let mut summary = self.summary.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut summary);
    }

    pub fn stream_clients(&self) -> u64 {
        self.stream_clients.load(Ordering::Relaxed)
    }

    /// Count a stream client until the returned guard is dropped.
    pub fn client_connected(self: &Arc<Self>) -> ClientGuard {
        self.stream_clients.fetch_add(1, Ordering::Relaxed);
        ClientGuard {
            status: Arc::clone(self),
        }
    }
}

/// Decrements the stream client count on drop.
#[derive(Debug)]
pub struct ClientGuard {
    status: Arc<PipelineStatus>,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.status.stream_clients.fetch_sub(1, Ordering::Relaxed);
    }
}
