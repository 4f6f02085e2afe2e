//! Motion monitor binary: detection loop plus HTTP stream server.

use std::net::SocketAddr;

use clap::Parser;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mwatch_api::{create_router, metrics, ApiConfig, AppState, Cli};
use mwatch_worker::{sounder_from_config, AlarmController, DetectionLoop, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mwatch=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting mwatch");

    // Load configuration
    let mut config = ApiConfig::from_env();
    let mut worker_config = WorkerConfig::from_env();
    cli.apply(&mut config, &mut worker_config);
    info!("API config: host={}, port={}", config.host, config.port);
    info!("Worker config: {:?}", worker_config);

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install metrics recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}: {}", config.bind_address(), e);
            std::process::exit(1);
        }
    };

    let source = match worker_config.source.open() {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open frame source: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(config);

    // Detection loop
    let sounder = sounder_from_config(&worker_config.alarm, Handle::current());
    let alarm = AlarmController::new(worker_config.alarm.clone(), sounder);
    let pipeline = DetectionLoop::new(
        source,
        &worker_config.detector,
        alarm,
        state.frames.clone(),
        state.status.clone(),
    )
    .with_shutdown(state.subscribe_shutdown())
    .with_rearm_signal(state.rearm.clone());
    let detection = tokio::task::spawn_blocking(move || pipeline.run());

    let app = create_router(state.clone(), metrics_handle);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            state.request_shutdown();
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    let shutdown_state = state.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_state.request_shutdown();
        })
        .await;
    if let Err(e) = served {
        error!("Server error: {}", e);
    }

    state.request_shutdown();
    match detection.await {
        Ok(Ok(outcome)) => info!(?outcome, "Detection loop finished"),
        Ok(Err(e)) => error!("Detection loop failed: {}", e),
        Err(e) => error!("Detection task panicked: {}", e),
    }

    info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
