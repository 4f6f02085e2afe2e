//! Shared data models for the motionwatch monitor.
//!
//! This crate provides Serde-serializable types for:
//! - Motion regions and their bounding boxes
//! - Alarm phases and re-arm policies
//! - Pipeline status snapshots served over HTTP

pub mod alarm;
pub mod region;
pub mod status;

// Re-export common types
pub use alarm::{AlarmPhase, RearmPolicy, RearmPolicyParseError};
pub use region::{BoundingBox, Region};
pub use status::DetectionSummary;
