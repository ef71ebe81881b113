//! Price history CSV.
//!
//! One row per paste action, appended and flushed immediately so nothing is
//! lost if the tool is closed mid-session.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::inject::Delivery;
use crate::pricing::{PricingConfig, Tier};

/// CSV header row.
const CSV_HEADER: &str = "timestamp,tier,raw,final,mode,value,rounding,floor,delivery";

/// One priced and delivered value.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Local>,
    pub tier: Tier,
    pub raw: u64,
    pub final_price: u64,
    pub pricing: PricingConfig,
    pub delivery: Delivery,
}

impl HistoryRecord {
    pub fn now(
        tier: Tier,
        raw: u64,
        final_price: u64,
        pricing: PricingConfig,
        delivery: Delivery,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            tier,
            raw,
            final_price,
            pricing,
            delivery,
        }
    }

    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            self.tier,
            self.raw,
            self.final_price,
            self.pricing.mode(),
            self.pricing.value(),
            self.pricing.rounding(),
            self.pricing.floor(),
            self.delivery,
        )
    }
}

/// Append-only history file.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    path: PathBuf,
}

impl PriceHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record`, writing the header first if the file is new or empty.
    pub fn record(&self, record: &HistoryRecord) -> Result<()> {
        init_csv(&self.path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open history CSV for append")?;

        writeln!(file, "{}", record.to_csv_line()).context("Failed to write history row")?;
        Ok(())
    }
}

/// Initializes CSV file with header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing history CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create history CSV")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write history header")?;
    Ok(())
}
