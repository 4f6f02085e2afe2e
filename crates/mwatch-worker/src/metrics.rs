//! Detection pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_PROCESSED_TOTAL: &str = "mwatch_frames_processed_total";
    pub const FRAME_PROCESSING_SECONDS: &str = "mwatch_frame_processing_seconds";
    pub const MOTION_REGIONS_TOTAL: &str = "mwatch_motion_regions_total";
    pub const MOTION_ACTIVE: &str = "mwatch_motion_active";
    pub const ALARMS_FIRED_TOTAL: &str = "mwatch_alarms_fired_total";
    pub const SOUNDER_FAILURES_TOTAL: &str = "mwatch_sounder_failures_total";
    pub const SOURCE_FINISHED: &str = "mwatch_source_finished";
}

/// Record one processed frame.
pub fn record_frame(duration_secs: f64, regions: usize) {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);
    histogram!(names::FRAME_PROCESSING_SECONDS).record(duration_secs);
    counter!(names::MOTION_REGIONS_TOTAL).increment(regions as u64);
    gauge!(names::MOTION_ACTIVE).set(if regions > 0 { 1.0 } else { 0.0 });
}

pub fn record_alarm_fired() {
    counter!(names::ALARMS_FIRED_TOTAL).increment(1);
}

pub fn record_sounder_failure(reason: &'static str) {
    counter!(names::SOUNDER_FAILURES_TOTAL, "reason" => reason).increment(1);
}

pub fn record_source_finished() {
    gauge!(names::SOURCE_FINISHED).set(1.0);
}
