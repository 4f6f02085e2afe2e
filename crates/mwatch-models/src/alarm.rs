//! Alarm phase and re-arm policy definitions.
//!
//! - `Idle`: outside the activation window, motion is ignored
//! - `Armed`: inside the activation window and eligible to fire
//! - `Cooling`: fired recently, re-fires are suppressed

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Observable phase of the alarm state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlarmPhase {
    #[default]
    Idle,
    Armed,
    Cooling,
}

impl AlarmPhase {
    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmPhase::Idle => "idle",
            AlarmPhase::Armed => "armed",
            AlarmPhase::Cooling => "cooling",
        }
    }

    /// Returns true if a qualifying region would fire the alarm right now.
    pub fn can_fire(&self) -> bool {
        matches!(self, AlarmPhase::Armed)
    }
}

impl fmt::Display for AlarmPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the activation window gets renewed once it lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// The controller renews its own window whenever it expires.
    #[default]
    Continuous,

    /// The window is renewed only when a stream client pulls a frame.
    /// Reproduces the legacy monitor where nobody watching means no alarm.
    StreamActivity,
}

impl RearmPolicy {
    /// Returns the policy name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RearmPolicy::Continuous => "continuous",
            RearmPolicy::StreamActivity => "stream_activity",
        }
    }
}

impl fmt::Display for RearmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RearmPolicy {
    type Err = RearmPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "continuous" | "always" => Ok(RearmPolicy::Continuous),
            "stream_activity" | "stream" => Ok(RearmPolicy::StreamActivity),
            _ => Err(RearmPolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown re-arm policy: {0}")]
pub struct RearmPolicyParseError(String);
