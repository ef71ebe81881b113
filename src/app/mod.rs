//! Orchestrator shared by the headless loop, the form and one-shot commands.
//!
//! `App` owns the settings, the region store, the pipeline and the output
//! backends. Each event runs to completion under a run lock; an event that
//! arrives while another is running is reported as busy and dropped.

pub mod outcome;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use anyhow::{anyhow, Result};

use crate::calibration::{self, PointerSource, RegionSet, RegionStore};
use crate::capture::ScreenCapture;
use crate::config::{AppConfig, SettingsInput};
use crate::error::PipelineError;
use crate::events::Event;
use crate::history::{HistoryRecord, PriceHistory};
use crate::inject::{self, Injector};
use crate::ocr::OcrEngine;
use crate::pipeline::{Pipeline, Quote};
use crate::pricing::{standard_pack_sizes, PricingConfig, Tier};

pub use outcome::{Channel, Delivered, Outcome, Report};

/// Platform backends the orchestrator drives.
pub struct Backends {
    pub capture: Box<dyn ScreenCapture>,
    pub ocr: Box<dyn OcrEngine>,
    pub injector: Box<dyn Injector>,
    pub pointer: Box<dyn PointerSource>,
}

impl Backends {
    /// Real backends for this machine.
    pub fn platform() -> Self {
        Self {
            capture: crate::capture::default_backend(),
            ocr: crate::ocr::default_engine(),
            injector: inject::default_injector(),
            pointer: calibration::default_pointer(),
        }
    }
}

pub struct App {
    config: Mutex<AppConfig>,
    config_path: PathBuf,
    pipeline: Pipeline,
    injector: Box<dyn Injector>,
    pointer: Box<dyn PointerSource>,
    history: PriceHistory,
    run_lock: Mutex<()>,
}

impl App {
    pub fn new(
        config: AppConfig,
        config_path: PathBuf,
        history: PriceHistory,
        backends: Backends,
    ) -> Self {
        let regions = Arc::new(RegionStore::from_map(&config.regions));
        Self {
            pipeline: Pipeline::new(backends.capture, backends.ocr, regions),
            config: Mutex::new(config),
            config_path,
            injector: backends.injector,
            pointer: backends.pointer,
            history,
            run_lock: Mutex::new(()),
        }
    }

    fn lock_config(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn regions(&self) -> &RegionStore {
        self.pipeline.regions()
    }

    /// Copy of the current settings, with the live regions.
    pub fn config(&self) -> AppConfig {
        let mut config = self.lock_config().clone();
        config.regions = self.regions().snapshot();
        config
    }

    /// Number of lots with a stored region.
    pub fn calibrated_count(&self) -> usize {
        self.regions().calibrated_count()
    }

    /// Run lock if no event is running.
    fn try_exclusive(&self) -> Option<MutexGuard<'_, ()>> {
        match self.run_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Runs one event to completion.
    pub fn handle(&self, event: Event) -> Outcome {
        let Some(_guard) = self.try_exclusive() else {
            tracing::warn!(%event, "busy, event ignored");
            return Outcome::Busy(event);
        };

        tracing::info!(%event, "handling event");
        let outcome = match event {
            Event::ReadPaste(tier) => self.read_and_paste(tier),
            Event::Optimize => self.optimize(),
            Event::Calibrate(tier) => self.calibrate(tier),
            Event::PrintAll => self.print_all(),
            Event::ShowPointer => match self.pointer.position() {
                Ok((x, y)) => Outcome::Pointer { x, y },
                Err(e) => Outcome::PointerUnavailable(format!("{:#}", e)),
            },
            Event::Quit => Outcome::Quit,
        };

        if let Outcome::Failed(e) = &outcome {
            tracing::error!(stage = %e.stage(), "{} ({})", e, e.hint());
        }
        outcome
    }

    fn pricing(&self) -> Result<(PricingConfig, bool, bool), PipelineError> {
        let config = self.lock_config();
        let pricing = config.pricing()?;
        Ok((pricing, config.auto_paste, config.record_history))
    }

    fn read_and_paste(&self, tier: Tier) -> Outcome {
        let (pricing, auto_paste, record) = match self.pricing() {
            Ok(p) => p,
            Err(e) => return Outcome::Failed(e),
        };

        let quote = match self.pipeline.quote(tier, &pricing) {
            Ok(q) => q,
            Err(e) => return Outcome::Failed(e),
        };

        match self.deliver(quote, &pricing, auto_paste, record) {
            Ok(Some(delivered)) => Outcome::Priced(delivered),
            Ok(None) => Outcome::NoPrice { tier },
            Err(e) => Outcome::Failed(e),
        }
    }

    fn optimize(&self) -> Outcome {
        let (pricing, auto_paste, record) = match self.pricing() {
            Ok(p) => p,
            Err(e) => return Outcome::Failed(e),
        };

        let optimization = match self.pipeline.optimize(&pricing, &standard_pack_sizes()) {
            Ok(o) => o,
            Err(e) => return Outcome::Failed(e),
        };

        let best = match optimization.best {
            Some(quote) => match self.deliver(quote, &pricing, auto_paste, record) {
                Ok(delivered) => delivered,
                Err(e) => return Outcome::Failed(e),
            },
            None => None,
        };

        Outcome::Optimized {
            prices: optimization.prices,
            best,
        }
    }

    /// Copies or pastes a priced quote and records it. `None` when the quote
    /// has no price.
    fn deliver(
        &self,
        quote: Quote,
        pricing: &PricingConfig,
        auto_paste: bool,
        record: bool,
    ) -> Result<Option<Delivered>, PipelineError> {
        let (Some(raw), Some(final_price)) = (quote.raw, quote.final_price) else {
            return Ok(None);
        };
        let tier = quote.tier;

        let delivery = inject::inject(self.injector.as_ref(), final_price, auto_paste)
            .map_err(|source| PipelineError::Injection { tier, source })?;

        tracing::info!(tier = %tier, raw, final_price, %delivery, "price delivered");

        if record {
            let row = HistoryRecord::now(tier, raw, final_price, *pricing, delivery);
            if let Err(e) = self.history.record(&row) {
                tracing::error!("Failed to record history: {:#}", e);
            }
        }

        Ok(Some(Delivered {
            tier,
            raw,
            final_price,
            delivery,
        }))
    }

    fn calibrate(&self, tier: Tier) -> Outcome {
        let (box_width, box_height) = match self.lock_config().box_size() {
            Ok(size) => size,
            Err(e) => return Outcome::Failed(e.into()),
        };

        let pointer = match self.pointer.position() {
            Ok(p) => p,
            Err(e) => return Outcome::PointerUnavailable(format!("{:#}", e)),
        };

        let region = calibration::calibrate_tier(self.regions(), tier, pointer, box_width, box_height);
        self.persist();
        Outcome::Calibrated { tier, region }
    }

    fn print_all(&self) -> Outcome {
        let (pricing, _, _) = match self.pricing() {
            Ok(p) => p,
            Err(e) => return Outcome::Failed(e),
        };

        let readings = self
            .pipeline
            .read_each()
            .into_iter()
            .map(|(tier, result)| {
                let quote = result.map(|raw| Quote {
                    tier,
                    raw,
                    final_price: crate::pricing::undercut(raw, &pricing),
                });
                (tier, quote)
            })
            .collect();

        Outcome::Readout(readings)
    }

    /// Writes the settings and live regions to disk; failures are logged.
    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::error!("Failed to save config: {:#}", e);
        }
    }

    /// Writes the settings and live regions to disk.
    pub fn save(&self) -> Result<()> {
        let mut config = self.lock_config();
        config.regions = self.regions().snapshot();
        config.save(&self.config_path)
    }

    /// Validates form input and saves it. Nothing changes if any field is
    /// invalid.
    pub fn apply_settings(&self, input: &SettingsInput) -> Result<()> {
        {
            let mut config = self.lock_config();
            input.apply_to(&mut config)?;
        }
        self.save()?;
        tracing::info!("Settings saved");
        Ok(())
    }

    pub fn set_auto_paste(&self, enabled: bool) {
        self.lock_config().auto_paste = enabled;
        self.persist();
    }

    /// Stores the current regions under `name`. Refused while an event runs.
    pub fn save_preset(&self, name: &str) -> Result<()> {
        let _guard = self.try_exclusive().ok_or_else(|| anyhow!("Busy, preset not saved"))?;
        let regions = self.regions().snapshot();
        self.lock_config().save_preset(name, regions)?;
        self.save()?;
        tracing::info!(preset = name.trim(), "Preset saved");
        Ok(())
    }

    /// Replaces the live regions with the preset `name`. Refused while an
    /// event runs, so a read never mixes two region sets.
    pub fn apply_preset(&self, name: &str) -> Result<RegionSet> {
        let _guard = self.try_exclusive().ok_or_else(|| anyhow!("Busy, preset not applied"))?;
        let regions = self.lock_config().preset(name)?;
        self.regions().replace_all(&regions);
        self.save()?;
        tracing::info!(preset = name.trim(), "Preset applied");
        Ok(regions)
    }

    pub fn delete_preset(&self, name: &str) -> Result<()> {
        self.lock_config().delete_preset(name)?;
        self.save()?;
        tracing::info!(preset = name.trim(), "Preset deleted");
        Ok(())
    }

    pub fn preset_names(&self) -> Vec<String> {
        self.lock_config().presets.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Region;
    use crate::error::{ConfigError, InjectionError, Stage};
    use crate::inject::Delivery;
    use crate::pipeline::tests::{FakeScreen, ScriptedOcr};
    use crate::pricing::{Rounding, UndercutMode};
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct Clipboard {
        values: Arc<Mutex<Vec<String>>>,
    }

    impl Injector for Clipboard {
        fn set_clipboard(&self, text: &str) -> Result<(), InjectionError> {
            self.values.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn simulate_paste(&self) -> Result<(), InjectionError> {
            Ok(())
        }
    }

    struct FixedPointer(Option<(i32, i32)>);

    impl PointerSource for FixedPointer {
        fn position(&self) -> anyhow::Result<(i32, i32)> {
            self.0.ok_or_else(|| anyhow::anyhow!("no pointer"))
        }
    }

    struct Harness {
        app: App,
        clipboard: Arc<Mutex<Vec<String>>>,
        dir: TempDir,
    }

    fn harness(config: AppConfig, ocr: &[&str]) -> Harness {
        let dir = tempdir().unwrap();
        let clipboard = Clipboard::default();
        let values = Arc::clone(&clipboard.values);
        let app = App::new(
            config,
            dir.path().join("config.json"),
            PriceHistory::new(dir.path().join("history.csv")),
            Backends {
                capture: Box::new(FakeScreen::new()),
                ocr: Box::new(ScriptedOcr::new(ocr)),
                injector: Box::new(clipboard),
                pointer: Box::new(FixedPointer(Some((500, 300)))),
            },
        );
        Harness {
            app,
            clipboard: values,
            dir,
        }
    }

    fn calibrated_config() -> AppConfig {
        let mut config = AppConfig::default();
        for (i, tier) in Tier::ALL.iter().enumerate() {
            config
                .regions
                .insert(*tier, Some(Region::new(100, 100 + 40 * i as i32, 60, 20)));
        }
        config
    }

    #[test]
    fn test_read_paste_delivers_and_records() {
        let h = harness(calibrated_config(), &["2,500"]);
        match h.app.handle(Event::ReadPaste(Tier::Ten)) {
            Outcome::Priced(d) => {
                assert_eq!((d.tier, d.raw, d.final_price), (Tier::Ten, 2500, 2499));
                assert_eq!(d.delivery, Delivery::Pasted);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*h.clipboard.lock().unwrap(), vec!["2499"]);

        let history = std::fs::read_to_string(h.dir.path().join("history.csv")).unwrap();
        assert_eq!(history.lines().count(), 2);
    }

    #[test]
    fn test_copy_only_when_auto_paste_off() {
        let mut config = calibrated_config();
        config.auto_paste = false;
        config.record_history = false;
        let h = harness(config, &["10"]);
        match h.app.handle(Event::ReadPaste(Tier::One)) {
            Outcome::Priced(d) => assert_eq!(d.delivery, Delivery::Copied),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!h.dir.path().join("history.csv").exists());
    }

    #[test]
    fn test_no_price_pastes_nothing() {
        let h = harness(AppConfig::default(), &[]);
        assert!(matches!(
            h.app.handle(Event::ReadPaste(Tier::Hundred)),
            Outcome::NoPrice { tier: Tier::Hundred }
        ));
        assert!(h.clipboard.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pricing_is_config_failure() {
        let mut config = calibrated_config();
        config.undercut_mode = UndercutMode::Percent;
        config.undercut_value = 250.0;
        let h = harness(config, &["100"]);
        match h.app.handle(Event::ReadPaste(Tier::One)) {
            Outcome::Failed(e) => {
                assert_eq!(e.stage(), Stage::Pricing);
                assert_eq!(e.tier(), None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // The pipeline stays usable
        let mut input = SettingsInput::from_config(&h.app.config());
        input.value = "10".to_string();
        h.app.apply_settings(&input).unwrap();
        assert!(matches!(h.app.handle(Event::ReadPaste(Tier::One)), Outcome::Priced(_)));
    }

    #[test]
    fn test_optimize_recommends_and_pastes() {
        let mut config = calibrated_config();
        config.rounding = Rounding::EndInNine;
        let h = harness(config, &["100", "950", "9000"]);
        match h.app.handle(Event::Optimize) {
            Outcome::Optimized { prices, best } => {
                assert_eq!(prices[&Tier::Hundred], Some(9000));
                let best = best.unwrap();
                assert_eq!(best.tier, Tier::One);
                assert_eq!(best.final_price, 99);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*h.clipboard.lock().unwrap(), vec!["99"]);
    }

    #[test]
    fn test_optimize_without_regions() {
        let h = harness(AppConfig::default(), &[]);
        let outcome = h.app.handle(Event::Optimize);
        assert!(matches!(outcome, Outcome::Optimized { best: None, .. }));
        assert_eq!(outcome.recommendation(), Some(None));
    }

    #[test]
    fn test_calibrate_stores_and_persists() {
        let h = harness(AppConfig::default(), &[]);
        match h.app.handle(Event::Calibrate(Tier::One)) {
            Outcome::Calibrated { tier, region } => {
                assert_eq!(tier, Tier::One);
                assert_eq!(region, Region::new(425, 280, 150, 40));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let saved = AppConfig::load(&h.dir.path().join("config.json"));
        assert_eq!(saved.regions[&Tier::One], Some(Region::new(425, 280, 150, 40)));
        assert_eq!(h.app.config().regions[&Tier::One], Some(Region::new(425, 280, 150, 40)));
    }

    #[test]
    fn test_busy_while_running() {
        let h = harness(calibrated_config(), &["1"]);
        let _running = h.app.run_lock.lock().unwrap();
        assert!(matches!(
            h.app.handle(Event::Optimize),
            Outcome::Busy(Event::Optimize)
        ));
    }

    #[test]
    fn test_print_all_reports_each_tier() {
        let mut config = calibrated_config();
        config.regions.insert(Tier::Ten, None);
        let h = harness(config, &["40", "3000"]);
        match h.app.handle(Event::PrintAll) {
            Outcome::Readout(readings) => {
                assert_eq!(readings.len(), 3);
                assert_eq!(readings[0].1.as_ref().unwrap().final_price, Some(39));
                assert_eq!(readings[1].1.as_ref().unwrap().raw, None);
                assert_eq!(readings[2].1.as_ref().unwrap().raw, Some(3000));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(h.clipboard.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settings_rejected_leave_config() {
        let h = harness(AppConfig::default(), &[]);
        let mut input = SettingsInput::from_config(&h.app.config());
        input.box_width = "wide".to_string();

        let err = h.app.apply_settings(&input).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotNumeric { field: "captureBoxWidth", .. })
        ));
        assert_eq!(h.app.config(), AppConfig::default());
        assert!(!h.dir.path().join("config.json").exists());
    }

    #[test]
    fn test_presets_round_trip_through_app() {
        let h = harness(calibrated_config(), &[]);
        h.app.save_preset("market").unwrap();

        h.app.handle(Event::Calibrate(Tier::One));
        assert_ne!(h.app.config().regions, calibrated_config().regions);

        h.app.apply_preset("market").unwrap();
        assert_eq!(h.app.config().regions, calibrated_config().regions);
        assert_eq!(h.app.preset_names(), vec!["market"]);

        h.app.delete_preset("market").unwrap();
        assert!(h.app.apply_preset("market").is_err());
    }

    #[test]
    fn test_preset_refused_while_event_runs() {
        let h = harness(calibrated_config(), &[]);
        h.app.save_preset("market").unwrap();
        h.app.handle(Event::Calibrate(Tier::One));
        let live = h.app.config().regions;

        {
            let _running = h.app.run_lock.lock().unwrap();
            assert!(h.app.apply_preset("market").is_err());
            assert!(h.app.save_preset("other").is_err());
        }
        assert_eq!(h.app.config().regions, live);
        assert_eq!(h.app.preset_names(), vec!["market"]);

        h.app.apply_preset("market").unwrap();
        assert_eq!(h.app.config().regions, calibrated_config().regions);
        assert_eq!(h.app.calibrated_count(), 3);
    }

    #[test]
    fn test_pointer_unavailable() {
        let dir = tempdir().unwrap();
        let app = App::new(
            AppConfig::default(),
            dir.path().join("config.json"),
            PriceHistory::new(dir.path().join("history.csv")),
            Backends {
                capture: Box::new(FakeScreen::new()),
                ocr: Box::new(ScriptedOcr::new(&[])),
                injector: Box::new(Clipboard::default()),
                pointer: Box::new(FixedPointer(None)),
            },
        );
        assert!(matches!(
            app.handle(Event::ShowPointer),
            Outcome::PointerUnavailable(_)
        ));
        assert!(matches!(
            app.handle(Event::Calibrate(Tier::Ten)),
            Outcome::PointerUnavailable(_)
        ));
        assert_eq!(app.config().regions[&Tier::Ten], None);
    }
}
