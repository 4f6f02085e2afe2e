//! Axum HTTP server for the motion monitor.
//!
//! This crate provides:
//! - The viewer page and the multipart MJPEG stream
//! - Liveness, readiness and detection status endpoints
//! - Prometheus metrics, request IDs and request logging
//! - The command line front end of the `mwatch` binary

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use cli::Cli;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
