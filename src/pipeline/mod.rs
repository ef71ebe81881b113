//! Capture -> normalize -> recognize -> price.
//!
//! The pipeline owns the backends and the region store. It holds no other
//! state: every read produces a fresh price from the current screen.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::calibration::RegionStore;
use crate::capture::{self, ScreenCapture};
use crate::error::PipelineError;
use crate::ocr::{self, OcrEngine};
use crate::pricing::{select_best_tier, undercut, PricingConfig, Tier};

/// Observed and proposed price for one tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    pub tier: Tier,
    pub raw: Option<u64>,
    pub final_price: Option<u64>,
}

/// Result of comparing every tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Optimization {
    /// Price read per tier, absent where nothing was read
    pub prices: BTreeMap<Tier, Option<u64>>,
    /// Recommended tier and its quote, if any tier had a price
    pub best: Option<Quote>,
}

pub struct Pipeline {
    capture: Box<dyn ScreenCapture>,
    ocr: Box<dyn OcrEngine>,
    regions: Arc<RegionStore>,
}

impl Pipeline {
    pub fn new(
        capture: Box<dyn ScreenCapture>,
        ocr: Box<dyn OcrEngine>,
        regions: Arc<RegionStore>,
    ) -> Self {
        Self {
            capture,
            ocr,
            regions,
        }
    }

    pub fn regions(&self) -> &Arc<RegionStore> {
        &self.regions
    }

    /// Reads the current lowest price for `tier`.
    ///
    /// An uncalibrated tier reads as absent.
    pub fn read_price(&self, tier: Tier) -> Result<Option<u64>, PipelineError> {
        let Some(region) = self.regions.get(tier) else {
            tracing::debug!(tier = %tier, "lot not calibrated");
            return Ok(None);
        };

        let pixels = capture::capture(self.capture.as_ref(), &region)
            .map_err(|source| PipelineError::Capture { tier, source })?;

        let raw = ocr::read_price(self.ocr.as_ref(), &pixels)
            .map_err(|source| PipelineError::Recognition { tier, source })?;

        tracing::debug!(tier = %tier, ?raw, "price read");
        Ok(raw)
    }

    /// Reads `tier` and applies `pricing`.
    pub fn quote(&self, tier: Tier, pricing: &PricingConfig) -> Result<Quote, PipelineError> {
        let raw = self.read_price(tier)?;
        Ok(Quote {
            tier,
            raw,
            final_price: undercut(raw, pricing),
        })
    }

    /// Reads every tier, stopping at the first failure.
    pub fn read_all(&self) -> Result<BTreeMap<Tier, Option<u64>>, PipelineError> {
        Tier::ALL
            .iter()
            .map(|&tier| Ok((tier, self.read_price(tier)?)))
            .collect()
    }

    /// Reads every tier independently; one tier failing does not hide the others.
    pub fn read_each(&self) -> Vec<(Tier, Result<Option<u64>, PipelineError>)> {
        Tier::ALL
            .iter()
            .map(|&tier| (tier, self.read_price(tier)))
            .collect()
    }

    /// Reads all tiers, picks the best one and prices it from the same reading.
    pub fn optimize(
        &self,
        pricing: &PricingConfig,
        pack_sizes: &BTreeMap<Tier, u32>,
    ) -> Result<Optimization, PipelineError> {
        let prices = self.read_all()?;
        let best = select_best_tier(&prices, pack_sizes).map(|tier| {
            let raw = prices.get(&tier).copied().flatten();
            Quote {
                tier,
                raw,
                final_price: undercut(raw, pricing),
            }
        });

        tracing::info!(?prices, best = ?best.map(|q| q.tier), "optimized");
        Ok(Optimization { prices, best })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capture::{PixelBuffer, Region};
    use crate::error::{CaptureError, RecognitionError, Stage};
    use crate::pricing::{standard_pack_sizes, Rounding, UndercutMode};
    use image::{GrayImage, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Screen that renders a light panel with a dark bar; fails for regions at `fail_x`.
    pub(crate) struct FakeScreen {
        pub fail_x: Option<i32>,
        pub grabs: Arc<AtomicUsize>,
    }

    impl FakeScreen {
        pub(crate) fn new() -> Self {
            Self {
                fail_x: None,
                grabs: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ScreenCapture for FakeScreen {
        fn grab(&self, region: &Region) -> Result<PixelBuffer, CaptureError> {
            self.grabs.fetch_add(1, Ordering::SeqCst);
            if self.fail_x == Some(region.x) {
                return Err(CaptureError::OutOfBounds {
                    region: *region,
                    screen: Region::new(0, 0, 1920, 1080),
                });
            }
            Ok(RgbImage::from_fn(region.width, region.height, |x, _| {
                if x % 7 < 2 {
                    Rgb([20, 20, 20])
                } else {
                    Rgb([230, 230, 230])
                }
            }))
        }
    }

    /// OCR that answers from a script, one entry per call.
    pub(crate) struct ScriptedOcr {
        pub replies: Mutex<VecDeque<Result<String, RecognitionError>>>,
    }

    impl ScriptedOcr {
        pub(crate) fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|s| Ok(s.to_string())).collect()),
            }
        }
    }

    impl OcrEngine for ScriptedOcr {
        fn read_text(&self, _img: &GrayImage, _whitelist: &str) -> Result<String, RecognitionError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    pub(crate) fn calibrated_store() -> Arc<RegionStore> {
        let store = RegionStore::new();
        store.set(Tier::One, Some(Region::new(100, 100, 60, 20)));
        store.set(Tier::Ten, Some(Region::new(100, 140, 60, 20)));
        store.set(Tier::Hundred, Some(Region::new(100, 180, 60, 20)));
        Arc::new(store)
    }

    fn fixed_one() -> PricingConfig {
        PricingConfig::new(UndercutMode::Fixed, 1.0, Rounding::None, 1).unwrap()
    }

    #[test]
    fn test_quote_reads_and_undercuts() {
        let pipeline = Pipeline::new(
            Box::new(FakeScreen::new()),
            Box::new(ScriptedOcr::new(&["1,250\n"])),
            calibrated_store(),
        );
        let quote = pipeline.quote(Tier::One, &fixed_one()).unwrap();
        assert_eq!(quote.raw, Some(1250));
        assert_eq!(quote.final_price, Some(1249));
    }

    #[test]
    fn test_uncalibrated_tier_is_absent_without_capture() {
        let screen = FakeScreen::new();
        let grabs = Arc::clone(&screen.grabs);
        let pipeline = Pipeline::new(
            Box::new(screen),
            Box::new(ScriptedOcr::new(&["99"])),
            Arc::new(RegionStore::new()),
        );
        let quote = pipeline.quote(Tier::Ten, &fixed_one()).unwrap();
        assert_eq!(quote.raw, None);
        assert_eq!(quote.final_price, None);
        assert_eq!(grabs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_digits_is_absent() {
        let pipeline = Pipeline::new(
            Box::new(FakeScreen::new()),
            Box::new(ScriptedOcr::new(&[""])),
            calibrated_store(),
        );
        assert_eq!(pipeline.read_price(Tier::Hundred).unwrap(), None);
    }

    #[test]
    fn test_capture_failure_carries_tier() {
        let mut screen = FakeScreen::new();
        screen.fail_x = Some(100);
        let pipeline = Pipeline::new(
            Box::new(screen),
            Box::new(ScriptedOcr::new(&[])),
            calibrated_store(),
        );
        let err = pipeline.read_price(Tier::Ten).unwrap_err();
        assert_eq!(err.tier(), Some(Tier::Ten));
        assert_eq!(err.stage(), Stage::Capture);
    }

    #[test]
    fn test_recognition_failure_carries_tier() {
        let ocr = ScriptedOcr {
            replies: Mutex::new(VecDeque::from([Err(RecognitionError::Timeout(
                std::time::Duration::from_secs(5),
            ))])),
        };
        let pipeline = Pipeline::new(Box::new(FakeScreen::new()), Box::new(ocr), calibrated_store());
        let err = pipeline.read_price(Tier::One).unwrap_err();
        assert_eq!(err.stage(), Stage::Recognition);
        assert_eq!(err.hint(), "check the Tesseract installation");
    }

    #[test]
    fn test_optimize_prices_best_tier_from_same_reading() {
        let pipeline = Pipeline::new(
            Box::new(FakeScreen::new()),
            Box::new(ScriptedOcr::new(&["100", "950", "9000"])),
            calibrated_store(),
        );
        let opt = pipeline.optimize(&fixed_one(), &standard_pack_sizes()).unwrap();
        assert_eq!(opt.prices[&Tier::Ten], Some(950));
        assert_eq!(
            opt.best,
            Some(Quote {
                tier: Tier::One,
                raw: Some(100),
                final_price: Some(99),
            })
        );
    }

    #[test]
    fn test_optimize_nothing_read() {
        let pipeline = Pipeline::new(
            Box::new(FakeScreen::new()),
            Box::new(ScriptedOcr::new(&[])),
            Arc::new(RegionStore::new()),
        );
        let opt = pipeline.optimize(&fixed_one(), &standard_pack_sizes()).unwrap();
        assert_eq!(opt.best, None);
        assert!(opt.prices.values().all(Option::is_none));
    }

    #[test]
    fn test_read_each_reports_per_tier() {
        let store = calibrated_store();
        store.set(Tier::Ten, Some(Region::new(5000, 0, 60, 20)));
        let mut screen = FakeScreen::new();
        screen.fail_x = Some(5000);
        let pipeline = Pipeline::new(
            Box::new(screen),
            Box::new(ScriptedOcr::new(&["10", "1000"])),
            store,
        );
        let results = pipeline.read_each();
        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].1.as_ref().unwrap(), Some(10));
        assert!(results[1].1.is_err());
        assert_eq!(*results[2].1.as_ref().unwrap(), Some(1000));
    }
}
