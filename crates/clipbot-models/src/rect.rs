use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::choice::AspectRatio;

/// An integer pixel rectangle inside a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CropRect {
    /// X coordinate of the top-left corner
    pub x: u32,
    /// Y coordinate of the top-left corner
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl CropRect {
    /// Create a new crop rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest rectangle at `ratio` centered in a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` for [`AspectRatio::Original`] and when the frame is too
    /// small to hold a non-empty rectangle at the requested ratio.
    pub fn centered(frame_width: u32, frame_height: u32, ratio: AspectRatio) -> Option<Self> {
        let (num, den) = ratio.dimensions()?;
        if frame_width == 0 || frame_height == 0 {
            return None;
        }

        let (w, h) = (u64::from(frame_width), u64::from(frame_height));
        let (num, den) = (u64::from(num), u64::from(den));

        let (width, height) = if num == den {
            let side = w.min(h);
            (side, side)
        } else if w * den > h * num {
            // Source is wider than the target: keep height, narrow the width.
            (h * num / den, h)
        } else {
            (w, w * den / num)
        };

        if width == 0 || height == 0 {
            return None;
        }

        // Both values are bounded by the frame, which fits in u32.
        let width = width as u32;
        let height = height as u32;
        Some(Self {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        })
    }

    /// Whether the rectangle is non-empty and lies inside the frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(frame_width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(frame_height)
    }

    /// FFmpeg `crop` filter expression.
    pub fn to_ffmpeg_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: &[(u32, u32)] = &[
        (1920, 1080),
        (1280, 720),
        (1080, 1920),
        (640, 480),
        (3840, 1600),
        (853, 480),
        (101, 37),
        (1, 1),
    ];

    #[test]
    fn test_square_uses_shorter_side() {
        let rect = CropRect::centered(1920, 1080, AspectRatio::Square).unwrap();
        assert_eq!(rect, CropRect::new(420, 0, 1080, 1080));

        let rect = CropRect::centered(720, 1280, AspectRatio::Square).unwrap();
        assert_eq!(rect, CropRect::new(0, 280, 720, 720));
    }

    #[test]
    fn test_portrait_from_landscape_narrows_width() {
        let rect = CropRect::centered(1920, 1080, AspectRatio::Portrait).unwrap();
        // 1080 * 9 / 16 = 607.5 -> 607
        assert_eq!(rect, CropRect::new(656, 0, 607, 1080));
    }

    #[test]
    fn test_landscape_from_portrait_shortens_height() {
        let rect = CropRect::centered(1080, 1920, AspectRatio::Landscape).unwrap();
        // 1080 * 9 / 16 = 607.5 -> 607
        assert_eq!(rect, CropRect::new(0, 656, 1080, 607));
    }

    #[test]
    fn test_matching_ratio_keeps_full_frame() {
        let rect = CropRect::centered(1920, 1080, AspectRatio::Landscape).unwrap();
        assert_eq!(rect, CropRect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn test_original_has_no_crop() {
        assert!(CropRect::centered(1920, 1080, AspectRatio::Original).is_none());
    }

    #[test]
    fn test_degenerate_frames() {
        assert!(CropRect::centered(0, 1080, AspectRatio::Square).is_none());
        // A one-pixel-high frame cannot hold a 9:16 slice.
        assert!(CropRect::centered(100, 1, AspectRatio::Portrait).is_none());
    }

    #[test]
    fn test_every_ratio_fits_and_matches_target() {
        for &(fw, fh) in FRAMES {
            for ratio in AspectRatio::ALL {
                let Some((num, den)) = ratio.dimensions() else {
                    continue;
                };
                let Some(rect) = CropRect::centered(fw, fh, *ratio) else {
                    continue;
                };

                assert!(rect.fits_within(fw, fh), "{ratio} on {fw}x{fh}: {rect:?}");

                // The cut dimension is within one pixel of the exact target.
                let ideal_w = rect.height as f64 * num as f64 / den as f64;
                let ideal_h = rect.width as f64 * den as f64 / num as f64;
                assert!(
                    (rect.width as f64 - ideal_w).abs() < 1.0
                        || (rect.height as f64 - ideal_h).abs() < 1.0,
                    "{ratio} on {fw}x{fh}: {rect:?}"
                );

                // Centered within one pixel.
                let right = fw - rect.x - rect.width;
                let bottom = fh - rect.y - rect.height;
                assert!(rect.x.abs_diff(right) <= 1, "{ratio} on {fw}x{fh}: {rect:?}");
                assert!(rect.y.abs_diff(bottom) <= 1, "{ratio} on {fw}x{fh}: {rect:?}");
            }
        }
    }

    #[test]
    fn test_ffmpeg_filter() {
        let rect = CropRect::new(656, 0, 607, 1080);
        assert_eq!(rect.to_ffmpeg_filter(), "crop=607:1080:656:0");
    }
}
