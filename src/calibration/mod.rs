//! Calibration: turns the pointer position into a capture region.
//!
//! The operator hovers over a price and presses the calibrate trigger for a
//! tier; a box of the configured size centred on the pointer becomes that
//! tier's region. Nothing on screen is validated.

pub mod coords;
pub mod store;

pub use coords::{default_pointer, PointerSource};
pub use store::{RegionSet, RegionStore};

use crate::capture::Region;
use crate::pricing::Tier;

/// Region of `box_width x box_height` centred on `pointer`.
///
/// Uses floor division, so odd box sizes put the extra pixel right/below.
pub fn calibrate(pointer: (i32, i32), box_width: u32, box_height: u32) -> Region {
    let (px, py) = pointer;
    let half_w = (i64::from(box_width) / 2) as i32;
    let half_h = (i64::from(box_height) / 2) as i32;
    Region::new(
        px.saturating_sub(half_w),
        py.saturating_sub(half_h),
        box_width,
        box_height,
    )
}

/// Calibrates `tier` at `pointer` and stores the result, replacing any
/// previous region for that tier.
pub fn calibrate_tier(
    store: &RegionStore,
    tier: Tier,
    pointer: (i32, i32),
    box_width: u32,
    box_height: u32,
) -> Region {
    let region = calibrate(pointer, box_width, box_height);
    store.set(tier, Some(region));
    tracing::info!(tier = %tier, %region, "calibrated");
    region
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrate_centres_box() {
        assert_eq!(calibrate((500, 300), 150, 40), Region::new(425, 280, 150, 40));
    }

    #[test]
    fn test_calibrate_odd_and_negative() {
        assert_eq!(calibrate((10, 10), 5, 3), Region::new(8, 9, 5, 3));
        assert_eq!(calibrate((-1900, 50), 150, 40), Region::new(-1975, 30, 150, 40));
        assert_eq!(calibrate((0, 0), 0, 0), Region::new(0, 0, 0, 0));
    }

    #[test]
    fn test_calibrate_tier_overwrites() {
        let store = RegionStore::new();
        calibrate_tier(&store, Tier::One, (100, 100), 20, 10);
        let region = calibrate_tier(&store, Tier::One, (500, 300), 150, 40);
        assert_eq!(store.get(Tier::One), Some(region));
        assert_eq!(store.get(Tier::Ten), None);
    }
}
