use std::collections::BTreeMap;
use std::fmt;

use crate::capture::Region;
use crate::error::PipelineError;
use crate::events::Event;
use crate::inject::Delivery;
use crate::pipeline::Quote;
use crate::pricing::Tier;

/// Log channel a message belongs to; the form colors each one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Lot(Tier),
    Optimize,
    Info,
    Error,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Lot(tier) => write!(f, "LOT{}", tier),
            Channel::Optimize => write!(f, "OPT"),
            Channel::Info => write!(f, "INFO"),
            Channel::Error => write!(f, "ERROR"),
        }
    }
}

/// One line for the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub channel: Channel,
    pub message: String,
}

impl Report {
    fn new(channel: Channel, message: impl Into<String>) -> Self {
        Self {
            channel,
            message: message.into(),
        }
    }
}

/// A price that reached the clipboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivered {
    pub tier: Tier,
    pub raw: u64,
    pub final_price: u64,
    pub delivery: Delivery,
}

/// What handling one event produced.
#[derive(Debug)]
pub enum Outcome {
    Priced(Delivered),
    /// Nothing readable, or the tier is not calibrated. Nothing was pasted.
    NoPrice { tier: Tier },
    Optimized {
        prices: BTreeMap<Tier, Option<u64>>,
        best: Option<Delivered>,
    },
    Calibrated { tier: Tier, region: Region },
    Readout(Vec<(Tier, Result<Quote, PipelineError>)>),
    Pointer { x: i32, y: i32 },
    PointerUnavailable(String),
    Failed(PipelineError),
    /// Another event was still running.
    Busy(Event),
    Quit,
}

fn or_dash(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn delivery_text(delivery: Delivery) -> &'static str {
    match delivery {
        Delivery::Pasted => "pasted (Ctrl+V)",
        Delivery::Copied => "copied (paste manually)",
    }
}

fn failure(e: &PipelineError) -> Report {
    Report::new(Channel::Error, format!("{} ({})", e, e.hint()))
}

impl Outcome {
    /// Recommended tier after an optimize run: `Some(None)` when nothing
    /// could be recommended, `None` for every other outcome.
    pub fn recommendation(&self) -> Option<Option<Tier>> {
        match self {
            Outcome::Optimized { best, .. } => Some(best.map(|d| d.tier)),
            _ => None,
        }
    }

    /// Lines to show for this outcome.
    pub fn reports(&self) -> Vec<Report> {
        match self {
            Outcome::Priced(d) => vec![Report::new(
                Channel::Lot(d.tier),
                format!(
                    "[{}] Read: {} -> Undercut: {} | {}",
                    d.tier,
                    d.raw,
                    d.final_price,
                    delivery_text(d.delivery)
                ),
            )],
            Outcome::NoPrice { tier } => vec![Report::new(
                Channel::Lot(*tier),
                format!("[{}] No price detected (lot not calibrated or unreadable)", tier),
            )],
            Outcome::Optimized { prices, best } => {
                let read = Tier::ALL
                    .iter()
                    .map(|t| format!("{}:{}", t, or_dash(prices.get(t).copied().flatten())))
                    .collect::<Vec<_>>()
                    .join(" | ");
                let mut lines = vec![Report::new(Channel::Optimize, format!("[OPT] Read {}", read))];
                lines.push(match best {
                    Some(d) => Report::new(
                        Channel::Optimize,
                        format!(
                            "[OPT] Recommended lot: {} | Read: {} -> Undercut: {} | {}",
                            d.tier,
                            d.raw,
                            d.final_price,
                            delivery_text(d.delivery)
                        ),
                    ),
                    None => Report::new(
                        Channel::Error,
                        "[OPT] No valid reading (calibrate lots 1/10/100)",
                    ),
                });
                lines
            }
            Outcome::Calibrated { tier, region } => vec![Report::new(
                Channel::Lot(*tier),
                format!("[Calib] Lot {} region = {}", tier, region),
            )],
            Outcome::Readout(readings) => readings
                .iter()
                .map(|(tier, result)| match result {
                    Ok(q) => Report::new(
                        Channel::Lot(*tier),
                        format!(
                            "[{}] Read: {} -> Undercut: {}",
                            tier,
                            or_dash(q.raw),
                            or_dash(q.final_price)
                        ),
                    ),
                    Err(e) => failure(e),
                })
                .collect(),
            Outcome::Pointer { x, y } => {
                vec![Report::new(Channel::Info, format!("Pointer at ({}, {})", x, y))]
            }
            Outcome::PointerUnavailable(reason) => vec![Report::new(
                Channel::Error,
                format!("Pointer position unavailable: {}", reason),
            )],
            Outcome::Failed(e) => vec![failure(e)],
            Outcome::Busy(event) => vec![Report::new(
                Channel::Info,
                format!("Busy, ignored {}", event),
            )],
            Outcome::Quit => vec![Report::new(Channel::Info, "Quitting")],
        }
    }
}
