//! Watermark rectangle and inpainting mask construction.
//!
//! The repair pipeline inpaints a fixed rectangle on every frame. The mask is
//! a binary luma image the size of the frame, 255 inside the rectangle and 0
//! everywhere else. Rectangles reaching past the frame edge are silently
//! clipped rather than rejected, so a slightly oversized selection still works.

use image::GrayImage;

/// Minimum rectangle width/height accepted by the CLI (pixels).
pub const MIN_REGION_SIZE: u32 = 10;

/// A fixed watermark rectangle in frame pixel coordinates.
///
/// Selected once per video and applied unchanged to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkRegion {
    /// Left edge (distance from the left of the frame).
    pub x: u32,
    /// Top edge (distance from the top of the frame).
    pub y: u32,
    /// Rectangle width in pixels.
    pub width: u32,
    /// Rectangle height in pixels.
    pub height: u32,
}

impl Default for WatermarkRegion {
    /// Matches the default selection offered to users: 200x80 at (20, 20).
    fn default() -> Self {
        Self {
            x: 20,
            y: 20,
            width: 200,
            height: 80,
        }
    }
}

impl WatermarkRegion {
    /// Create a region from left/top/width/height.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the region to a frame of the given dimensions.
    ///
    /// Returns the clipped rectangle as `(x, y, width, height)`, or `None`
    /// when the region lies entirely outside the frame (nothing to inpaint).
    #[must_use]
    pub fn clipped_to(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        let x2 = self.x.saturating_add(self.width).min(frame_width);
        let y2 = self.y.saturating_add(self.height).min(frame_height);
        if x2 <= self.x || y2 <= self.y {
            return None;
        }
        Some((self.x, self.y, x2 - self.x, y2 - self.y))
    }

    /// Build the per-run inpainting mask for frames of the given dimensions.
    ///
    /// The mask content never varies between frames, so the pipeline builds
    /// it once and reuses it. Returns `None` when the clipped region is empty.
    #[must_use]
    pub fn build_mask(&self, frame_width: u32, frame_height: u32) -> Option<GrayImage> {
        let (x, y, w, h) = self.clipped_to(frame_width, frame_height)?;
        let mut mask = GrayImage::new(frame_width, frame_height);
        for dy in 0..h {
            for dx in 0..w {
                mask.put_pixel(x + dx, y + dy, image::Luma([255u8]));
            }
        }
        Some(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_region_matches_documented_selection() {
        let r = WatermarkRegion::default();
        assert_eq!((r.x, r.y, r.width, r.height), (20, 20, 200, 80));
    }

    #[test]
    fn region_inside_frame_is_unchanged_by_clipping() {
        let r = WatermarkRegion::new(20, 20, 200, 80);
        assert_eq!(r.clipped_to(640, 480), Some((20, 20, 200, 80)));
    }

    #[test]
    fn region_past_frame_edge_is_clipped_not_rejected() {
        let r = WatermarkRegion::new(600, 400, 200, 200);
        assert_eq!(r.clipped_to(640, 480), Some((600, 400, 40, 80)));
    }

    #[test]
    fn region_fully_outside_frame_yields_nothing() {
        let r = WatermarkRegion::new(700, 500, 50, 50);
        assert_eq!(r.clipped_to(640, 480), None);
        assert!(r.build_mask(640, 480).is_none());
    }

    #[test]
    fn zero_sized_region_yields_nothing() {
        let r = WatermarkRegion::new(10, 10, 0, 0);
        assert_eq!(r.clipped_to(640, 480), None);
    }

    #[test]
    fn mask_is_nonzero_exactly_inside_rectangle() {
        let r = WatermarkRegion::new(2, 3, 4, 5);
        let mask = r.build_mask(16, 16).unwrap();
        assert_eq!(mask.dimensions(), (16, 16));
        for y in 0..16 {
            for x in 0..16 {
                let inside = (2..6).contains(&x) && (3..8).contains(&y);
                let expected = if inside { 255 } else { 0 };
                assert_eq!(
                    mask.get_pixel(x, y)[0],
                    expected,
                    "mask mismatch at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn minimum_size_region_at_origin_builds_a_mask() {
        let r = WatermarkRegion::new(0, 0, MIN_REGION_SIZE, MIN_REGION_SIZE);
        let mask = r.build_mask(640, 480).unwrap();
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(9, 9)[0], 255);
        assert_eq!(mask.get_pixel(10, 10)[0], 0);
    }
}
