//! Alarm playback.
//!
//! The alarm controller only knows the [`Sounder`] capability. Playback
//! must return immediately; anything slow happens on a detached task and
//! failures end up in the log, never in the detection loop.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::AlarmConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Fire-and-forget alarm side effect.
pub trait Sounder: Send + Sync {
    fn play_alert(&self);
}

/// Runs an external player for every alert.
#[derive(Debug)]
pub struct CommandSounder {
    program: String,
    args: Vec<String>,
    runtime: Handle,
}

impl CommandSounder {
    /// Build from a whitespace separated command line such as
    /// `mpg321 --stereo alarm.mp3`.
    pub fn from_command_line(command: &str, runtime: Handle) -> WorkerResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| WorkerError::config_error("Alarm command is empty"))?;

        which::which(&program).map_err(|e| {
            WorkerError::sounder_unavailable(format!("{program} not found in PATH: {e}"))
        })?;

        Ok(Self {
            program,
            args: parts.collect(),
            runtime,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Sounder for CommandSounder {
    fn play_alert(&self) {
        let _guard = self.runtime.enter();

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to start alarm player");
                metrics::record_sounder_failure("spawn");
                return;
            }
        };

        let program = self.program.clone();
        self.runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!(program = %program, "Alarm playback finished")
                }
                Ok(status) => {
                    warn!(
                        program = %program,
                        exit_code = ?status.code(),
                        "Alarm player exited with failure"
                    );
                    metrics::record_sounder_failure("exit");
                }
                Err(e) => {
                    warn!(program = %program, error = %e, "Failed to wait for alarm player");
                    metrics::record_sounder_failure("wait");
                }
            }
        });
    }
}

/// Logs alerts instead of playing them. Used when no player is available.
#[derive(Debug, Default)]
pub struct NullSounder {
    alerts: AtomicU64,
}

impl NullSounder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts received so far.
    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }
}

impl Sounder for NullSounder {
    fn play_alert(&self) {
        let n = self.alerts.fetch_add(1, Ordering::Relaxed) + 1;
        info!(alert = n, "Alarm triggered (no player configured)");
    }
}

/// Pick the sounder for `config`, falling back to logging only when the
/// player is disabled or missing.
pub fn sounder_from_config(config: &AlarmConfig, runtime: Handle) -> Arc<dyn Sounder> {
    if config.command.trim().is_empty() {
        info!("Alarm playback disabled");
        return Arc::new(NullSounder::new());
    }

    match CommandSounder::from_command_line(&config.command, runtime) {
        Ok(sounder) => {
            info!(program = %sounder.program(), "Alarm player ready");
            Arc::new(sounder)
        }
        Err(e) => {
            warn!(error = %e, "Alarm player unavailable, alarms will only be logged");
            Arc::new(NullSounder::new())
        }
    }
}
