use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lot size offered on the marketplace.
///
/// The set is closed: each tier owns one screen region and one pack multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "100")]
    Hundred,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::One, Tier::Ten, Tier::Hundred];

    /// Units sold in one listing of this tier.
    pub fn pack_size(self) -> u32 {
        match self {
            Tier::One => 1,
            Tier::Ten => 10,
            Tier::Hundred => 100,
        }
    }

    /// Key used in the config file and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Tier::One => "1",
            Tier::Ten => "10",
            Tier::Hundred => "100",
        }
    }

    /// Position in `Tier::ALL`.
    pub fn index(self) -> usize {
        match self {
            Tier::One => 0,
            Tier::Ten => 1,
            Tier::Hundred => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Tier::One),
            "10" => Ok(Tier::Ten),
            "100" => Ok(Tier::Hundred),
            other => Err(format!("unknown lot {:?} (expected 1, 10 or 100)", other)),
        }
    }
}

/// Pack sizes of the standard tiers, `{1: 1, 10: 10, 100: 100}`.
pub fn standard_pack_sizes() -> BTreeMap<Tier, u32> {
    Tier::ALL.iter().map(|&t| (t, t.pack_size())).collect()
}
