//! Alarm debounce and cooldown.
//!
//! The controller is evaluated once per processed frame with the frame's
//! timestamp and region set. It fires only while armed and at most once
//! per cooldown window. Time is always passed in, never read, so the
//! state machine is deterministic under test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mwatch_models::{AlarmPhase, RearmPolicy, Region};
use tracing::{debug, info};

use crate::config::AlarmConfig;
use crate::sounder::Sounder;

/// Request to renew the activation window, set from outside the
/// detection loop and consumed by it.
#[derive(Debug, Clone, Default)]
pub struct RearmSignal(Arc<AtomicBool>);

impl RearmSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether a request was pending and clears it.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Alarm state machine. Owned by the detection loop.
pub struct AlarmController {
    config: AlarmConfig,
    sounder: Arc<dyn Sounder>,
    cooldown_until: Option<Instant>,
    armed_until: Option<Instant>,
    fired: u64,
}

impl AlarmController {
    pub fn new(config: AlarmConfig, sounder: Arc<dyn Sounder>) -> Self {
        Self {
            config,
            sounder,
            cooldown_until: None,
            armed_until: None,
            fired: 0,
        }
    }

    /// Open (or extend) the activation window starting at `now`.
    pub fn arm(&mut self, now: Instant) {
        self.armed_until = Some(now + self.config.activation_window);
    }

    /// Alarms fired since construction.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn phase(&self, now: Instant) -> AlarmPhase {
        if self.cooldown_until.is_some_and(|until| now <= until) {
            AlarmPhase::Cooling
        } else if self.armed_until.is_some_and(|until| now <= until) {
            AlarmPhase::Armed
        } else {
            AlarmPhase::Idle
        }
    }

    /// Evaluate one frame. Returns `true` when the alarm fired.
    pub fn observe(&mut self, now: Instant, regions: &[Region]) -> bool {
        if self.cooldown_until.is_some_and(|until| now > until) {
            debug!("Alarm cooldown elapsed");
            self.cooldown_until = None;
        }

        if self.armed_until.is_some_and(|until| now > until) {
            match self.config.rearm {
                RearmPolicy::Continuous => self.arm(now),
                RearmPolicy::StreamActivity => {
                    info!("Activation window lapsed, alarm idle until re-armed");
                    self.armed_until = None;
                }
            }
        }

        if regions.is_empty() || !self.phase(now).can_fire() {
            return false;
        }

        self.cooldown_until = Some(now + self.config.cooldown);
        self.fired += 1;
        info!(
            regions = regions.len(),
            alarm = self.fired,
            cooldown_secs = self.config.cooldown.as_secs_f64(),
            "Motion detected, sounding alarm"
        );
        self.sounder.play_alert();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sounder::NullSounder;
    use mwatch_models::BoundingBox;
    use std::time::Duration;

    fn region() -> Region {
        Region::new(BoundingBox::new(10, 10, 50, 50), 2500.0)
    }

    fn controller(rearm: RearmPolicy) -> (AlarmController, Arc<NullSounder>) {
        let sounder = Arc::new(NullSounder::new());
        let config = AlarmConfig {
            cooldown: Duration::from_secs(5),
            activation_window: Duration::from_secs(30),
            rearm,
            command: String::new(),
        };
        (AlarmController::new(config, sounder.clone()), sounder)
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_unarmed_never_fires() {
        let (mut alarm, sounder) = controller(RearmPolicy::StreamActivity);
        let t0 = Instant::now();
        assert_eq!(alarm.phase(t0), AlarmPhase::Idle);
        assert!(!alarm.observe(t0, &[region()]));
        assert_eq!(sounder.alerts(), 0);
    }

    #[test]
    fn test_fires_once_per_cooldown() {
        let (mut alarm, sounder) = controller(RearmPolicy::Continuous);
        let t0 = Instant::now();
        alarm.arm(t0);
        assert_eq!(alarm.phase(t0), AlarmPhase::Armed);

        assert!(alarm.observe(t0, &[region()]));
        assert_eq!(alarm.phase(t0), AlarmPhase::Cooling);

        // Motion in every frame at ~30 fps for the rest of the window.
        for i in 1..150 {
            assert!(!alarm.observe(t0 + secs(i as f64 / 30.0), &[region()]));
        }
        assert_eq!(sounder.alerts(), 1);
        assert_eq!(alarm.fired(), 1);
    }

    #[test]
    fn test_no_regions_never_fires() {
        let (mut alarm, sounder) = controller(RearmPolicy::Continuous);
        let t0 = Instant::now();
        alarm.arm(t0);
        for i in 0..300 {
            assert!(!alarm.observe(t0 + secs(i as f64 / 10.0), &[]));
        }
        assert_eq!(sounder.alerts(), 0);
        assert_eq!(alarm.phase(t0 + secs(30.0)), AlarmPhase::Armed);
    }

    #[test]
    fn test_refires_after_cooldown_while_armed() {
        let (mut alarm, sounder) = controller(RearmPolicy::StreamActivity);
        let t0 = Instant::now();
        alarm.arm(t0);

        assert!(alarm.observe(t0, &[region()]));
        // Exactly at the boundary the cooldown is still active.
        assert!(!alarm.observe(t0 + ms(5_000), &[region()]));
        assert!(alarm.observe(t0 + ms(5_100), &[region()]));
        assert!(!alarm.observe(t0 + ms(6_000), &[region()]));

        assert_eq!(sounder.alerts(), 2);
        assert_eq!(alarm.cooldown_until, Some(t0 + ms(10_100)));
    }

    #[test]
    fn test_quiet_frame_clears_cooldown() {
        let (mut alarm, _sounder) = controller(RearmPolicy::Continuous);
        let t0 = Instant::now();
        alarm.arm(t0);
        alarm.observe(t0, &[region()]);

        alarm.observe(t0 + secs(6.0), &[]);
        assert_eq!(alarm.cooldown_until, None);
        assert_eq!(alarm.phase(t0 + secs(6.0)), AlarmPhase::Armed);
    }

    #[test]
    fn test_window_lapses_without_rearm() {
        let (mut alarm, sounder) = controller(RearmPolicy::StreamActivity);
        let t0 = Instant::now();
        alarm.arm(t0);

        assert!(!alarm.observe(t0 + secs(31.0), &[region()]));
        assert_eq!(alarm.phase(t0 + secs(31.0)), AlarmPhase::Idle);
        assert_eq!(alarm.armed_until, None);

        alarm.arm(t0 + secs(40.0));
        assert!(alarm.observe(t0 + secs(40.0), &[region()]));
        assert_eq!(sounder.alerts(), 1);
    }

    #[test]
    fn test_continuous_policy_renews_window() {
        let (mut alarm, sounder) = controller(RearmPolicy::Continuous);
        let t0 = Instant::now();
        alarm.arm(t0);

        assert!(alarm.observe(t0 + secs(31.0), &[region()]));
        assert_eq!(alarm.armed_until, Some(t0 + secs(61.0)));
        assert_eq!(sounder.alerts(), 1);
    }

    #[test]
    fn test_rearm_signal_take_clears() {
        let signal = RearmSignal::new();
        assert!(!signal.take());

        let remote = signal.clone();
        remote.request();
        remote.request();
        assert!(signal.take());
        assert!(!signal.take());
    }
}
