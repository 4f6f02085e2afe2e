//! Motion detection worker.
//!
//! This crate provides:
//! - `FrameSlot`, the single-slot latest-value hand-off between the
//!   detection loop and stream clients
//! - The alarm debounce/cooldown state machine and its `Sounder` capability
//! - The detection loop tying source, detector, alarm and slot together
//! - Environment-driven configuration and pipeline metrics

pub mod alarm;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod slot;
pub mod sounder;
pub mod status;

pub use alarm::{AlarmController, RearmSignal};
pub use config::{AlarmConfig, DetectorConfig, SourceSpec, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use pipeline::{DetectionLoop, LoopOutcome, StepReport};
pub use slot::{FrameSlot, Snapshot};
pub use sounder::{sounder_from_config, CommandSounder, NullSounder, Sounder};
pub use status::{ClientGuard, PipelineStatus};
