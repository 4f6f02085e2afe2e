//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use mwatch_models::RearmPolicy;
use mwatch_worker::{SourceSpec, WorkerConfig};

use crate::config::ApiConfig;

/// Motion-detecting camera monitor with a live MJPEG stream.
///
/// Values given here override the environment (`.env` included).
#[derive(Debug, Parser)]
#[command(name = "mwatch", version, about)]
pub struct Cli {
    /// Video file to analyse instead of a live device
    #[arg(short = 'v', long, conflicts_with = "device")]
    pub video: Option<PathBuf>,

    /// Capture device read through ffmpeg (e.g. /dev/video0)
    #[arg(short = 'd', long)]
    pub device: Option<String>,

    /// OpenCV camera index
    #[cfg(feature = "opencv")]
    #[arg(short = 'c', long)]
    pub camera: Option<i32>,

    /// Pace file input at its native frame rate
    #[arg(long)]
    pub realtime: bool,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// What keeps the alarm armed: continuous or stream-activity
    #[arg(long)]
    pub rearm: Option<RearmPolicy>,

    /// Log alarms instead of playing a sound
    #[arg(long)]
    pub mute: bool,
}

impl Cli {
    /// Fold command line overrides into the loaded configuration.
    pub fn apply(&self, api: &mut ApiConfig, worker: &mut WorkerConfig) {
        if let Some(host) = &self.host {
            api.host = host.clone();
        }
        if let Some(port) = self.port {
            api.port = port;
        }

        if let Some(path) = &self.video {
            worker.source = SourceSpec::File {
                path: path.clone(),
                realtime: self.realtime,
            };
        } else if let Some(device) = &self.device {
            worker.source = SourceSpec::Device(device.clone());
        } else if let SourceSpec::File { realtime, .. } = &mut worker.source {
            *realtime |= self.realtime;
        }

        #[cfg(feature = "opencv")]
        if let Some(index) = self.camera {
            if self.video.is_none() && self.device.is_none() {
                worker.source = SourceSpec::Camera(index);
            }
        }

        if let Some(policy) = self.rearm {
            worker.alarm.rearm = policy;
        }
        if self.mute {
            worker.alarm.command.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (ApiConfig, WorkerConfig) {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut api = ApiConfig::default();
        let mut worker = WorkerConfig::default();
        cli.apply(&mut api, &mut worker);
        (api, worker)
    }

    #[test]
    fn test_defaults_untouched() {
        let (api, worker) = parse(&["mwatch"]);
        assert_eq!(api.port, 8000);
        assert_eq!(worker.source, SourceSpec::default());
        assert_eq!(worker.alarm.rearm, RearmPolicy::Continuous);
    }

    #[test]
    fn test_video_file() {
        let (_, worker) = parse(&["mwatch", "--video", "door.mp4", "--realtime"]);
        assert_eq!(
            worker.source,
            SourceSpec::File {
                path: PathBuf::from("door.mp4"),
                realtime: true
            }
        );
    }

    #[test]
    fn test_device_and_bind() {
        let (api, worker) = parse(&[
            "mwatch", "-d", "/dev/video2", "--host", "127.0.0.1", "-p", "9000",
        ]);
        assert_eq!(worker.source, SourceSpec::Device("/dev/video2".to_string()));
        assert_eq!(api.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_video_conflicts_with_device() {
        assert!(Cli::try_parse_from(["mwatch", "-v", "a.mp4", "-d", "/dev/video0"]).is_err());
    }

    #[test]
    fn test_rearm_and_mute() {
        let (_, worker) = parse(&["mwatch", "--rearm", "stream-activity", "--mute"]);
        assert_eq!(worker.alarm.rearm, RearmPolicy::StreamActivity);
        assert!(worker.alarm.command.is_empty());
    }

    #[test]
    fn test_bad_rearm_rejected() {
        assert!(Cli::try_parse_from(["mwatch", "--rearm", "sometimes"]).is_err());
    }
}
