//! Pricing decisions: undercut arithmetic and lot selection.
//!
//! Everything here is pure; the pipeline feeds it recognized prices.

pub mod optimizer;
pub mod tier;
pub mod undercut;

pub use optimizer::{select_best_tier, unit_quotes, UnitQuote};
pub use tier::{standard_pack_sizes, Tier};
pub use undercut::{undercut, PricingConfig, Rounding, UndercutMode};
