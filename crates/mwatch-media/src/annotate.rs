//! Overlay drawing for the published stream.

use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use mwatch_models::Region;

use crate::Frame;

/// Outline color for motion regions.
pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const MOTION_MARKER: Rgb<u8> = Rgb([255, 0, 0]);
const IDLE_MARKER: Rgb<u8> = Rgb([0, 160, 0]);
const MARKER_SIZE: u32 = 12;

/// Outline every region with a two-pixel border.
pub fn draw_regions(frame: &mut Frame, regions: &[Region], color: Rgb<u8>) {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    for region in regions {
        let bbox = region.bbox.clamp(width, height);
        let outer = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height);
        draw_hollow_rect_mut(frame, outer, color);

        if bbox.width > 2 && bbox.height > 2 {
            let inner = Rect::at(bbox.x as i32 + 1, bbox.y as i32 + 1)
                .of_size(bbox.width - 2, bbox.height - 2);
            draw_hollow_rect_mut(frame, inner, color);
        }
    }
}

/// Small status square in the top-left corner: red while motion is seen.
pub fn draw_status_marker(frame: &mut Frame, motion: bool) {
    let color = if motion { MOTION_MARKER } else { IDLE_MARKER };
    draw_filled_rect_mut(frame, Rect::at(8, 8).of_size(MARKER_SIZE, MARKER_SIZE), color);
}
