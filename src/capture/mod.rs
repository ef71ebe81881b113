//! Fixed-region screen capture.
//!
//! This module provides:
//! - The `Region` type shared by calibration and capture
//! - The `ScreenCapture` backend seam
//! - `capture`, which validates a region and checks the backend's output

pub mod screenshot;

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

pub use screenshot::default_backend;

/// Captured pixels: RGB, no alpha, exactly `width x height`.
pub type PixelBuffer = RgbImage;

/// Axis-aligned rectangle in virtual-screen pixel coordinates.
///
/// `x`/`y` may be negative on multi-monitor layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// True when `self` lies entirely inside `outer`.
    pub fn is_within(&self, outer: &Region) -> bool {
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

/// Source of screen pixels.
pub trait ScreenCapture: Send + Sync {
    /// Grabs the pixels under `region`.
    fn grab(&self, region: &Region) -> Result<PixelBuffer, CaptureError>;
}

/// Captures `region` through `backend`.
///
/// No retries: a failure goes straight back to the caller, which decides
/// whether the operator should recalibrate.
pub fn capture(backend: &dyn ScreenCapture, region: &Region) -> Result<PixelBuffer, CaptureError> {
    if region.is_empty() {
        return Err(CaptureError::EmptyRegion(*region));
    }

    let pixels = backend.grab(region)?;

    if pixels.dimensions() != (region.width, region.height) {
        return Err(CaptureError::SizeMismatch {
            expected_width: region.width,
            expected_height: region.height,
            actual_width: pixels.width(),
            actual_height: pixels.height(),
        });
    }

    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct SolidScreen {
        shrink: u32,
    }

    impl ScreenCapture for SolidScreen {
        fn grab(&self, region: &Region) -> Result<PixelBuffer, CaptureError> {
            Ok(RgbImage::from_pixel(
                region.width - self.shrink,
                region.height,
                Rgb([200, 200, 200]),
            ))
        }
    }

    #[test]
    fn test_capture_returns_region_sized_buffer() {
        let region = Region::new(10, 20, 150, 40);
        let buf = capture(&SolidScreen { shrink: 0 }, &region).unwrap();
        assert_eq!(buf.dimensions(), (150, 40));
    }

    #[test]
    fn test_capture_rejects_empty_region() {
        let err = capture(&SolidScreen { shrink: 0 }, &Region::new(0, 0, 0, 40)).unwrap_err();
        assert!(matches!(err, CaptureError::EmptyRegion(_)));
    }

    #[test]
    fn test_capture_rejects_wrong_size() {
        let err = capture(&SolidScreen { shrink: 1 }, &Region::new(0, 0, 10, 10)).unwrap_err();
        assert!(matches!(err, CaptureError::SizeMismatch { actual_width: 9, .. }));
    }

    #[test]
    fn test_region_bounds() {
        let screen = Region::new(-1920, 0, 3840, 1080);
        assert!(Region::new(-1920, 0, 100, 100).is_within(&screen));
        assert!(Region::new(1800, 1000, 40, 80).is_within(&screen));
        assert!(!Region::new(1900, 0, 40, 10).is_within(&screen));
        assert!(!Region::new(-1921, 0, 10, 10).is_within(&screen));
    }
}
