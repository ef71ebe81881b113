//! Persisted settings.
//!
//! Loads `undercut_helper_config.json` at startup and rewrites it after every
//! change. A missing or unreadable file is never fatal: the problem is logged
//! and defaults are used.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::calibration::RegionSet;
use crate::error::ConfigError;
use crate::pricing::undercut::parse_integer;
use crate::pricing::{PricingConfig, Rounding, Tier, UndercutMode};

/// Default capture box, wide enough for a seven-digit price.
pub const DEFAULT_BOX_WIDTH: u32 = 150;
pub const DEFAULT_BOX_HEIGHT: u32 = 40;

/// Complete application settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Calibrated region per tier
    #[serde(default = "empty_regions")]
    pub regions: RegionSet,
    #[serde(default = "default_box_width")]
    pub capture_box_width: u32,
    #[serde(default = "default_box_height")]
    pub capture_box_height: u32,
    #[serde(default)]
    pub undercut_mode: UndercutMode,
    /// Whole currency units in fixed mode, percent in percent mode
    #[serde(default = "default_undercut_value")]
    pub undercut_value: f64,
    /// Lowest price ever proposed; negative values are rejected by `pricing()`
    #[serde(default = "default_min_price")]
    pub min_price: i64,
    #[serde(default)]
    pub rounding: Rounding,
    #[serde(default = "default_true")]
    pub auto_paste: bool,
    /// Named region sets
    #[serde(default)]
    pub presets: BTreeMap<String, RegionSet>,
    /// Append every paste action to the history CSV
    #[serde(default = "default_true")]
    pub record_history: bool,
}

fn empty_regions() -> RegionSet {
    Tier::ALL.iter().map(|&t| (t, None)).collect()
}

fn default_box_width() -> u32 {
    DEFAULT_BOX_WIDTH
}

fn default_box_height() -> u32 {
    DEFAULT_BOX_HEIGHT
}

fn default_undercut_value() -> f64 {
    1.0
}

fn default_min_price() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            regions: empty_regions(),
            capture_box_width: DEFAULT_BOX_WIDTH,
            capture_box_height: DEFAULT_BOX_HEIGHT,
            undercut_mode: UndercutMode::Fixed,
            undercut_value: default_undercut_value(),
            min_price: default_min_price(),
            rounding: Rounding::None,
            auto_paste: true,
            presets: BTreeMap::new(),
            record_history: true,
        }
    }
}

impl AppConfig {
    /// Loads settings from `path`, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        tracing::info!(path = %path.display(), "Looking for config");

        if !path.exists() {
            tracing::info!("Config file not found. Using defaults.");
            return Self::default();
        }

        match Self::read(path) {
            Ok(config) => {
                tracing::info!("Config loaded");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Self =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        // Older files may list only some tiers
        for tier in Tier::ALL {
            config.regions.entry(tier).or_insert(None);
        }
        Ok(config)
    }

    /// Writes settings to `path`. The file is replaced atomically so a crash
    /// mid-write never leaves a truncated config behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp config")?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write config")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validated pricing parameters for one pipeline call.
    pub fn pricing(&self) -> Result<PricingConfig, ConfigError> {
        PricingConfig::new(
            self.undercut_mode,
            self.undercut_value,
            self.rounding,
            self.min_price,
        )
    }

    /// Capture box size, rejected when either side is zero.
    pub fn box_size(&self) -> Result<(u32, u32), ConfigError> {
        check_box_side("captureBoxWidth", self.capture_box_width)?;
        check_box_side("captureBoxHeight", self.capture_box_height)?;
        Ok((self.capture_box_width, self.capture_box_height))
    }

    /// Stores `regions` under `name`, replacing a preset of the same name.
    pub fn save_preset(&mut self, name: &str, regions: RegionSet) -> Result<(), ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "presetName",
                value: String::new(),
                reason: "must not be empty",
            });
        }
        self.presets.insert(name.to_string(), regions);
        Ok(())
    }

    /// Region set stored under `name`, completed with every tier.
    pub fn preset(&self, name: &str) -> Result<RegionSet, ConfigError> {
        let stored = self
            .presets
            .get(name.trim())
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
        Ok(Tier::ALL
            .iter()
            .map(|&t| (t, stored.get(&t).copied().flatten()))
            .collect())
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        self.presets
            .remove(name.trim())
            .map(|_| ())
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
    }
}

fn check_box_side(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            reason: "must be a positive number of pixels",
        });
    }
    Ok(())
}

/// Settings as typed into the form, before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsInput {
    pub mode: String,
    pub value: String,
    pub rounding: String,
    pub min_price: String,
    pub box_width: String,
    pub box_height: String,
    pub auto_paste: bool,
    pub record_history: bool,
}

impl SettingsInput {
    /// Current values of `config` rendered as text.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mode: config.undercut_mode.key().to_string(),
            value: config.undercut_value.to_string(),
            rounding: config.rounding.key().to_string(),
            min_price: config.min_price.to_string(),
            box_width: config.capture_box_width.to_string(),
            box_height: config.capture_box_height.to_string(),
            auto_paste: config.auto_paste,
            record_history: config.record_history,
        }
    }

    /// Validates every field and writes them into `config`.
    ///
    /// On error `config` is left untouched.
    pub fn apply_to(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        let pricing = PricingConfig::parse(&self.mode, &self.value, &self.rounding, &self.min_price)?;
        let box_width = parse_box_side("captureBoxWidth", &self.box_width)?;
        let box_height = parse_box_side("captureBoxHeight", &self.box_height)?;

        config.undercut_mode = pricing.mode();
        config.undercut_value = pricing.value();
        config.rounding = pricing.rounding();
        config.min_price = i64::try_from(pricing.floor()).unwrap_or(i64::MAX);
        config.capture_box_width = box_width;
        config.capture_box_height = box_height;
        config.auto_paste = self.auto_paste;
        config.record_history = self.record_history;
        Ok(())
    }
}

fn parse_box_side(field: &'static str, text: &str) -> Result<u32, ConfigError> {
    let value = parse_integer(field, text)?;
    let side = u32::try_from(value).map_err(|_| ConfigError::OutOfRange {
        field,
        value: value.to_string(),
        reason: "must be a positive number of pixels",
    })?;
    check_box_side(field, side)?;
    Ok(side)
}
