//! Undercut Helper
//!
//! Reads the lowest marketplace price for a lot from a calibrated screen
//! region, proposes an undercut, and copies or pastes it.

pub mod app;
pub mod calibration;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod gui;
pub mod history;
pub mod hotkeys;
pub mod inject;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod pipeline;
pub mod pricing;
