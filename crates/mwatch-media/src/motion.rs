//! Motion region detection.
//!
//! Per frame: update the background model, erode the foreground mask to
//! knock out sensor grain and thin bridges between blobs, trace the outer
//! contour of every remaining component and keep those whose contour area
//! reaches `min_area`.

use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology::erode;
use tracing::trace;

use mwatch_models::{BoundingBox, Region};

use crate::background::{BackgroundParams, MixtureBackground};
use crate::GrayFrame;

/// Detector tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Smallest contour area reported as a region
    pub min_area: f64,
    /// 3x3 erosion passes applied to the foreground mask
    pub erode_iterations: u8,
    /// Background model parameters
    pub background: BackgroundParams,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            min_area: 600.0,
            erode_iterations: 2,
            background: BackgroundParams::default(),
        }
    }
}

/// Background-subtraction motion detector.
pub struct MotionDetector {
    config: MotionConfig,
    background: MixtureBackground,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            background: MixtureBackground::new(config.background),
            config,
        }
    }

    /// Frames folded into the background model.
    pub fn frames_seen(&self) -> u64 {
        self.background.frames_seen()
    }

    /// Update the background with `gray` and return regions that moved.
    pub fn detect(&mut self, gray: &GrayFrame) -> Vec<Region> {
        let mask = self.foreground(gray);
        let regions = self.regions(&mask);
        trace!(regions = regions.len(), "Motion regions extracted");
        regions
    }

    /// Model update plus erosion: the cleaned foreground mask.
    fn foreground(&mut self, gray: &GrayFrame) -> GrayFrame {
        let mask = self.background.apply(gray);
        if self.config.erode_iterations == 0 {
            return mask;
        }
        // An L-infinity ball of radius k is k passes of a 3x3 square
        erode(&mask, Norm::LInf, self.config.erode_iterations)
    }

    fn regions(&self, mask: &GrayFrame) -> Vec<Region> {
        find_contours::<u32>(mask)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| self.to_region(c))
            .collect()
    }

    fn to_region(&self, contour: &Contour<u32>) -> Option<Region> {
        let bbox = BoundingBox::enclosing(contour.points.iter().map(|p| (p.x, p.y)))?;
        Some(Region::new(bbox, contour_area(contour))).filter(|r| r.meets(self.config.min_area))
    }
}

/// Polygon area enclosed by a traced contour (shoelace formula).
///
/// Measured through pixel centers, so a filled `n x n` square has area
/// `(n - 1)^2`.
pub fn contour_area(contour: &Contour<u32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum();

    twice_area.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::point::Point;

    fn background() -> GrayFrame {
        GrayFrame::from_pixel(160, 120, Luma([30]))
    }

    fn with_square(mut frame: GrayFrame, x0: u32, y0: u32, size: u32) -> GrayFrame {
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                frame.put_pixel(x, y, Luma([220]));
            }
        }
        frame
    }

    fn warmed_detector() -> MotionDetector {
        let mut detector = MotionDetector::new(MotionConfig::default());
        for _ in 0..3 {
            assert!(detector.detect(&background()).is_empty());
        }
        detector
    }

    #[test]
    fn test_contour_area_of_square() {
        let contour = Contour {
            points: vec![
                Point::new(0, 0),
                Point::new(9, 0),
                Point::new(9, 9),
                Point::new(0, 9),
            ],
            border_type: BorderType::Outer,
            parent: None,
        };
        assert_eq!(contour_area(&contour), 81.0);
    }

    #[test]
    fn test_large_square_is_reported() {
        let mut detector = warmed_detector();
        let regions = detector.detect(&with_square(background(), 40, 30, 50));

        assert_eq!(regions.len(), 1);
        let region = regions[0];
        // Two erosion passes shave two pixels off every side
        assert_eq!(region.bbox, BoundingBox::new(42, 32, 46, 46));
        assert_eq!(region.area, 45.0 * 45.0);
    }

    #[test]
    fn test_small_blob_is_filtered() {
        let mut detector = warmed_detector();
        // 20x20 erodes to 16x16, contour area 225 < 600
        let mask = detector.foreground(&with_square(background(), 40, 30, 20));
        assert_eq!(mask.get_pixel(50, 40), &Luma([255]));
        assert!(detector.regions(&mask).is_empty());
    }

    #[test]
    fn test_speckle_noise_is_eroded_away() {
        let mut detector = warmed_detector();
        let mut frame = background();
        for (x, y) in [(10, 10), (50, 70), (120, 20), (130, 100)] {
            frame = with_square(frame, x, y, 3);
        }
        let mask = detector.foreground(&frame);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
        assert!(detector.regions(&mask).is_empty());
    }

    #[test]
    fn test_separate_objects_yield_separate_regions() {
        let mut detector = warmed_detector();
        let frame = with_square(with_square(background(), 5, 5, 40), 100, 60, 40);
        let mut regions = detector.detect(&frame);
        regions.sort_by_key(|r| r.bbox.x);

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bbox, BoundingBox::new(7, 7, 36, 36));
        assert_eq!(regions[1].bbox, BoundingBox::new(102, 62, 36, 36));
    }

    #[test]
    fn test_min_area_is_configurable() {
        let mut detector = MotionDetector::new(MotionConfig {
            min_area: 100.0,
            ..Default::default()
        });
        detector.detect(&background());
        let regions = detector.detect(&with_square(background(), 40, 30, 20));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 225.0);
    }

    #[test]
    fn test_region_exactly_at_min_area_is_kept() {
        let detect_with = |min_area| {
            let mut detector = MotionDetector::new(MotionConfig {
                min_area,
                ..Default::default()
            });
            detector.detect(&background());
            detector.detect(&with_square(background(), 40, 30, 20))
        };
        assert_eq!(detect_with(225.0).len(), 1);
        assert!(detect_with(225.5).is_empty());
    }
}
