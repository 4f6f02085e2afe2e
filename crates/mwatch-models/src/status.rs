//! Pipeline status snapshot served by `/status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmPhase;

/// Point-in-time summary of the detection loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Frames run through the detector since startup
    pub frames_processed: u64,
    /// Regions reported for the most recent frame
    pub last_region_count: usize,
    /// Area of the largest region in the most recent frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_region_area: Option<f64>,
    /// Alarm phase after the most recent frame
    pub alarm_phase: AlarmPhase,
    /// Number of times the alarm has fired
    pub alarms_fired: u64,
    /// Wall-clock time of the last alarm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_alarm_at: Option<DateTime<Utc>>,
    /// Whether the frame source reported end of input
    pub source_finished: bool,
    /// Currently connected stream clients
    pub stream_clients: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json_shape() {
        let summary = DetectionSummary {
            frames_processed: 12,
            last_region_count: 1,
            largest_region_area: Some(2025.0),
            alarm_phase: AlarmPhase::Cooling,
            alarms_fired: 1,
            ..Default::default()
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["frames_processed"], 12);
        assert_eq!(json["alarm_phase"], "cooling");
        assert!(json.get("last_alarm_at").is_none());
    }
}
