//! Motion regions reported by the detector.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates of the display frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: u32,
    /// Top edge y-coordinate
    pub y: u32,
    /// Box width
    pub width: u32,
    /// Box height
    pub height: u32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the smallest box covering all points, or `None` for an empty set.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (min_x, min_y, max_x, max_y) = iter.fold((x0, y0, x0, y0), |(lx, ly, hx, hy), (x, y)| {
            (lx.min(x), ly.min(y), hx.max(x), hy.max(y))
        });

        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Clamp the box so it lies inside a frame of the given size.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let x = self.x.min(frame_width.saturating_sub(1));
        let y = self.y.min(frame_height.saturating_sub(1));
        let width = self.width.min(frame_width - x).max(1);
        let height = self.height.min(frame_height - y).max(1);

        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }
}

/// A connected foreground component that survived area filtering.
///
/// `area` is the contour area, which is smaller than the box area for
/// anything that is not a filled axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bbox: BoundingBox,
    pub area: f64,
}

impl Region {
    /// Create a new region.
    pub fn new(bbox: BoundingBox, area: f64) -> Self {
        Self { bbox, area }
    }

    /// Whether this region meets a minimum-area threshold.
    #[inline]
    pub fn meets(&self, min_area: f64) -> bool {
        self.area >= min_area
    }
}

/// Area of the largest region in a set.
pub fn largest_area(regions: &[Region]) -> Option<f64> {
    regions.iter().map(|r| r.area).reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_box() {
        let bbox = BoundingBox::enclosing([(10, 20), (59, 20), (59, 69), (10, 69)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(10, 20, 50, 50));
    }

    #[test]
    fn test_enclosing_empty() {
        assert!(BoundingBox::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_clamp_to_frame() {
        let bbox = BoundingBox::new(580, 440, 50, 50).clamp(600, 450);
        assert_eq!(bbox, BoundingBox::new(580, 440, 20, 10));
    }

    #[test]
    fn test_region_threshold() {
        let region = Region::new(BoundingBox::new(0, 0, 30, 30), 841.0);
        assert!(region.meets(600.0));
        assert!(!region.meets(900.0));
    }

    #[test]
    fn test_largest_area() {
        let regions = vec![
            Region::new(BoundingBox::new(0, 0, 10, 10), 81.0),
            Region::new(BoundingBox::new(0, 0, 40, 40), 1521.0),
        ];
        assert_eq!(largest_area(&regions), Some(1521.0));
        assert_eq!(largest_area(&[]), None);
    }
}
