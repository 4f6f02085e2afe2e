//! Detection loop.
//!
//! Reads frames from a source and pushes each one through preprocess,
//! detect, alarm, annotate and publish. Runs on a blocking thread; the
//! only things it shares are the frame slot, the status board and the
//! re-arm flag.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use mwatch_media::{
    draw_regions, draw_status_marker, Frame, FrameSource, MotionDetector, Preprocessed,
    Preprocessor, REGION_COLOR,
};
use mwatch_models::region::largest_area;
use mwatch_models::{AlarmPhase, Region};

use crate::alarm::{AlarmController, RearmSignal};
use crate::config::DetectorConfig;
use crate::error::WorkerResult;
use crate::metrics;
use crate::slot::FrameSlot;
use crate::status::PipelineStatus;

/// Why [`DetectionLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The source ran out of frames (or delivered a malformed one)
    EndOfInput,
    /// A stop was requested
    Stopped,
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub regions: Vec<Region>,
    pub fired: bool,
    pub phase: AlarmPhase,
    pub generation: u64,
}

pub struct DetectionLoop<S> {
    source: S,
    preprocessor: Preprocessor,
    detector: MotionDetector,
    alarm: AlarmController,
    annotate: bool,
    slot: Arc<FrameSlot<Frame>>,
    status: Arc<PipelineStatus>,
    rearm: RearmSignal,
    shutdown: watch::Receiver<bool>,
}

impl<S: FrameSource> DetectionLoop<S> {
    pub fn new(
        source: S,
        config: &DetectorConfig,
        alarm: AlarmController,
        slot: Arc<FrameSlot<Frame>>,
        status: Arc<PipelineStatus>,
    ) -> Self {
        // Sender dropped: the loop never sees a stop unless one is attached.
        let (_, shutdown) = watch::channel(false);
        Self {
            source,
            preprocessor: Preprocessor::new(config.preprocess_config()),
            detector: MotionDetector::new(config.motion_config()),
            alarm,
            annotate: config.annotate,
            slot,
            status,
            rearm: RearmSignal::new(),
            shutdown,
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_rearm_signal(mut self, rearm: RearmSignal) -> Self {
        self.rearm = rearm;
        self
    }

    /// Arm the alarm as of `now`. `run` does this on entry.
    pub fn arm(&mut self, now: Instant) {
        self.alarm.arm(now);
    }

    /// Process frames until the source ends or a stop is requested.
    pub fn run(mut self) -> WorkerResult<LoopOutcome> {
        info!(source = %self.source.describe(), "Detection loop started");
        self.arm(Instant::now());

        loop {
            if *self.shutdown.borrow() {
                info!(frames = self.detector.frames_seen(), "Detection loop stopped");
                return Ok(LoopOutcome::Stopped);
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(self.finish()),
                Err(e) if e.is_end_of_input() => {
                    warn!(error = %e, "Unreadable frame, treating as end of input");
                    return Ok(self.finish());
                }
                Err(e) => {
                    error!(error = %e, "Frame source failed");
                    self.mark_finished();
                    return Err(e.into());
                }
            };

            match self.step(&frame, Instant::now()) {
                Ok(_) => {}
                Err(e) if e.is_end_of_input() => {
                    warn!(error = %e, "Malformed frame, treating as end of input");
                    return Ok(self.finish());
                }
                Err(e) => {
                    error!(error = %e, "Frame processing failed");
                    self.mark_finished();
                    return Err(e);
                }
            }
        }
    }

    /// Process one raw frame observed at `now`.
    pub fn step(&mut self, raw: &Frame, now: Instant) -> WorkerResult<StepReport> {
        let started = Instant::now();
        let Preprocessed { mut display, gray } = self.preprocessor.process(raw)?;

        let regions = self.detector.detect(&gray);

        if self.rearm.take() {
            debug!("Re-arm requested");
            self.alarm.arm(now);
        }
        let fired = self.alarm.observe(now, &regions);
        let phase = self.alarm.phase(now);

        if self.annotate {
            draw_regions(&mut display, &regions, REGION_COLOR);
            draw_status_marker(&mut display, !regions.is_empty());
        }
        // The slot takes ownership; the next iteration works on a new buffer.
        let generation = self.slot.publish(display);

        metrics::record_frame(started.elapsed().as_secs_f64(), regions.len());
        if fired {
            metrics::record_alarm_fired();
        }
        self.status.update(|s| {
            s.frames_processed += 1;
            s.last_region_count = regions.len();
            s.largest_region_area = largest_area(&regions);
            s.alarm_phase = phase;
            if fired {
                s.alarms_fired += 1;
                s.last_alarm_at = Some(Utc::now());
            }
        });

        if !regions.is_empty() {
            debug!(
                regions = regions.len(),
                largest = largest_area(&regions).unwrap_or_default(),
                phase = %phase,
                "Motion regions"
            );
        }

        Ok(StepReport {
            regions,
            fired,
            phase,
            generation,
        })
    }

    fn mark_finished(&self) {
        self.status.update(|s| s.source_finished = true);
        metrics::record_source_finished();
    }

    fn finish(&self) -> LoopOutcome {
        self.mark_finished();
        info!(
            frames = self.detector.frames_seen(),
            alarms = self.alarm.fired(),
            "Frame source exhausted"
        );
        LoopOutcome::EndOfInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlarmConfig;
    use crate::sounder::NullSounder;
    use image::Rgb;
    use mwatch_media::MemoryFrameSource;

    fn small_config() -> DetectorConfig {
        DetectorConfig {
            frame_width: 160,
            ..DetectorConfig::default()
        }
    }

    fn uniform(value: u8) -> Frame {
        Frame::from_pixel(160, 120, Rgb([value, value, value]))
    }

    fn build(
        frames: Vec<Frame>,
    ) -> (
        DetectionLoop<MemoryFrameSource>,
        Arc<FrameSlot<Frame>>,
        Arc<PipelineStatus>,
    ) {
        let slot = Arc::new(FrameSlot::new());
        let status = Arc::new(PipelineStatus::new());
        let alarm = AlarmController::new(AlarmConfig::default(), Arc::new(NullSounder::new()));
        let pipeline = DetectionLoop::new(
            MemoryFrameSource::new(frames),
            &small_config(),
            alarm,
            slot.clone(),
            status.clone(),
        );
        (pipeline, slot, status)
    }

    #[test]
    fn test_run_until_end_of_input() {
        let (pipeline, slot, status) = build(vec![uniform(40); 4]);
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome, LoopOutcome::EndOfInput);
        assert_eq!(slot.generation(), 4);
        let summary = status.snapshot();
        assert_eq!(summary.frames_processed, 4);
        assert!(summary.source_finished);
        assert_eq!(summary.alarms_fired, 0);
    }

    #[test]
    fn test_stop_request_ends_loop() {
        let (tx, rx) = watch::channel(false);
        let (pipeline, slot, status) = build(vec![uniform(40); 4]);
        tx.send(true).unwrap();

        let outcome = pipeline.with_shutdown(rx).run().unwrap();
        assert_eq!(outcome, LoopOutcome::Stopped);
        assert!(!slot.has_value());
        assert!(!status.snapshot().source_finished);
    }

    #[test]
    fn test_malformed_frame_ends_input() {
        let frames = vec![uniform(40), Frame::new(0, 0), uniform(40)];
        let (pipeline, slot, status) = build(frames);

        assert_eq!(pipeline.run().unwrap(), LoopOutcome::EndOfInput);
        assert_eq!(slot.generation(), 1);
        assert!(status.snapshot().source_finished);
    }

    #[test]
    fn test_published_frame_is_resized() {
        let (mut pipeline, slot, _status) = build(Vec::new());
        let raw = Frame::from_pixel(320, 240, Rgb([10, 10, 10]));
        let report = pipeline.step(&raw, Instant::now()).unwrap();

        let snap = slot.latest().unwrap();
        assert_eq!(snap.generation, report.generation);
        assert_eq!(snap.value.dimensions(), (160, 120));
    }

    #[test]
    fn test_rearm_signal_is_consumed() {
        let (pipeline, _slot, _status) = build(Vec::new());
        let signal = RearmSignal::new();
        let mut pipeline = pipeline.with_rearm_signal(signal.clone());

        let now = Instant::now();
        assert_eq!(pipeline.alarm.phase(now), AlarmPhase::Idle);
        signal.request();
        pipeline.step(&uniform(40), now).unwrap();

        assert_eq!(pipeline.alarm.phase(now), AlarmPhase::Armed);
        assert!(!signal.take());
    }
}
