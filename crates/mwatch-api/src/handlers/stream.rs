//! MJPEG streaming.
//!
//! Every client gets its own task that polls the frame slot on a fixed
//! interval, JPEG-encodes frames it has not sent yet and writes them as
//! `multipart/x-mixed-replace` parts. A client that reads slowly only
//! delays its own task; it never holds the slot.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use mwatch_media::encode_jpeg;
use mwatch_worker::{ClientGuard, PipelineStatus};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart boundary token.
pub const BOUNDARY: &str = "frame";

/// `Content-Type` of the stream response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// Wrap one JPEG as a multipart part.
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let mut part = BytesMut::with_capacity(PART_HEADER.len() + jpeg.len() + 2);
    part.put_slice(PART_HEADER);
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Continuous multipart JPEG stream of the annotated frames.
pub async fn video_feed(State(state): State<AppState>) -> Response {
    let client = StreamClient::connect(state.status.clone());

    let body = stream! {
        let _client = client;
        let quality = state.config.jpeg_quality;
        let mut shutdown = state.subscribe_shutdown();
        let mut ticker = tokio::time::interval(state.config.stream_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                debug!("Closing stream for shutdown");
                break;
            }

            // Nothing published yet, or nothing new since the last part.
            let Some(snapshot) = state.frames.latest_since(sent) else {
                continue;
            };

            let frame = snapshot.value;
            match tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality)).await {
                Ok(Ok(jpeg)) => {
                    sent = snapshot.generation;
                    state.rearm.request();
                    metrics::record_frame_streamed(jpeg.len());
                    yield Ok::<Bytes, Infallible>(multipart_part(&jpeg));
                }
                Ok(Err(e)) => {
                    // Skip this frame; the next tick tries the next one.
                    sent = snapshot.generation;
                    warn!(error = %e, generation = snapshot.generation, "Failed to encode frame");
                    metrics::record_encode_failure();
                }
                Err(e) => {
                    warn!(error = %e, "Encode task failed");
                    metrics::record_encode_failure();
                }
            }
        }
    };

    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// Single JPEG of the latest frame.
pub async fn snapshot(State(state): State<AppState>) -> ApiResult<Response> {
    let snapshot = state
        .frames
        .latest()
        .ok_or_else(|| ApiError::not_ready("No frame published yet"))?;

    let quality = state.config.jpeg_quality;
    let frame = snapshot.value;
    let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality))
        .await
        .map_err(|e| ApiError::internal(format!("Encode task failed: {e}")))??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        jpeg,
    )
        .into_response())
}

/// Keeps the client count and gauge current for the lifetime of a stream.
struct StreamClient {
    status: Arc<PipelineStatus>,
    guard: Option<ClientGuard>,
}

impl StreamClient {
    fn connect(status: Arc<PipelineStatus>) -> Self {
        let guard = status.client_connected();
        let active = status.stream_clients();
        metrics::record_stream_connected(active);
        info!(clients = active, "Stream client connected");
        Self {
            status,
            guard: Some(guard),
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        drop(self.guard.take());
        let active = self.status.stream_clients();
        metrics::set_stream_clients(active);
        info!(clients = active, "Stream client disconnected");
    }
}
