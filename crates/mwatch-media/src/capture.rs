//! OpenCV `VideoCapture` frame source for numbered camera devices.

use opencv::core::{AlgorithmHint, Mat};
use opencv::imgproc;
use opencv::prelude::{
    MatTraitConst, MatTraitConstManual, VideoCaptureTrait, VideoCaptureTraitConst,
};
use opencv::videoio::{VideoCapture, CAP_ANY};
use tracing::info;

use crate::error::{MediaError, MediaResult};
use crate::source::FrameSource;
use crate::Frame;

/// Frame source backed by an OpenCV capture handle.
pub struct CaptureFrameSource {
    cap: VideoCapture,
    label: String,
}

impl CaptureFrameSource {
    /// Open a camera by index (0 is usually the built-in webcam).
    pub fn camera(index: i32) -> MediaResult<Self> {
        let cap = VideoCapture::new(index, CAP_ANY)
            .map_err(|e| MediaError::capture(format!("Open camera {index}: {e}")))?;
        Self::opened(cap, format!("camera:{index}"))
    }

    fn opened(cap: VideoCapture, label: String) -> MediaResult<Self> {
        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::capture(format!("Failed to open {label}")));
        }
        info!(source = %label, "Opened OpenCV frame source");
        Ok(Self { cap, label })
    }
}

impl FrameSource for CaptureFrameSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        let mut bgr = Mat::default();
        let read_ok = self
            .cap
            .read(&mut bgr)
            .map_err(|e| MediaError::capture(format!("Read: {e}")))?;

        if !read_ok || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &bgr,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| MediaError::capture(format!("bgr2rgb: {e}")))?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb
            .data_bytes()
            .map_err(|e| MediaError::capture(format!("frame bytes: {e}")))?
            .to_vec();

        Frame::from_raw(width, height, data)
            .map(Some)
            .ok_or_else(|| MediaError::invalid_frame("capture buffer does not match frame size"))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
