//! Error taxonomy for the price pipeline.
//!
//! An absent price is never an error: it travels as `None` through every
//! stage. The types here cover the failures the operator has to act on.

use std::time::Duration;

use thiserror::Error;

use crate::capture::Region;
use crate::pricing::Tier;

/// The screen region could not be read.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("region {0} has zero width or height")]
    EmptyRegion(Region),

    #[error("region {region} lies outside the virtual screen {screen}")]
    OutOfBounds { region: Region, screen: Region },

    #[error("screen capture is unavailable: {0}")]
    Unavailable(String),

    #[error("capture backend failed: {0}")]
    Backend(String),

    #[error("capture returned {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    SizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// The OCR engine could not produce text.
///
/// "No digits found" is not represented here; it is a normal absent result.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR engine not found: {0}")]
    EngineNotFound(String),

    #[error("OCR engine exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },

    #[error("OCR engine did not finish within {0:?}")]
    Timeout(Duration),

    #[error("could not stage image for OCR: {0}")]
    Image(#[from] image::ImageError),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pricing or capture-box parameter is not usable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} is not a number: {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} = {value} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("unknown {field}: {value:?}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("no preset named {0:?}")]
    UnknownPreset(String),
}

/// The clipboard or paste simulation failed.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("paste simulation failed: {0}")]
    Paste(String),

    #[error("clipboard injection is unavailable on this platform")]
    Unavailable,
}

/// Pipeline stage where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Recognition,
    Pricing,
    Injection,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Capture => write!(f, "capture"),
            Stage::Recognition => write!(f, "recognition"),
            Stage::Pricing => write!(f, "pricing"),
            Stage::Injection => write!(f, "injection"),
        }
    }
}

/// A stage failure with the tier it happened on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("lot {tier}: {source}")]
    Capture {
        tier: Tier,
        #[source]
        source: CaptureError,
    },

    #[error("lot {tier}: {source}")]
    Recognition {
        tier: Tier,
        #[source]
        source: RecognitionError,
    },

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("lot {tier}: {source}")]
    Injection {
        tier: Tier,
        #[source]
        source: InjectionError,
    },
}

impl PipelineError {
    /// Tier the failure belongs to, if any.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Capture { tier, .. }
            | Self::Recognition { tier, .. }
            | Self::Injection { tier, .. } => Some(*tier),
            Self::Config(_) => None,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Capture { .. } => Stage::Capture,
            Self::Recognition { .. } => Stage::Recognition,
            Self::Config(_) => Stage::Pricing,
            Self::Injection { .. } => Stage::Injection,
        }
    }

    /// Short instruction for the operator.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Capture {
                source: CaptureError::Unavailable(_),
                ..
            } => "screen capture is not supported here",
            Self::Capture { .. } => "recalibrate this lot",
            Self::Recognition { .. } => "check the Tesseract installation",
            Self::Config(_) => "check the pricing settings",
            Self::Injection { .. } => "paste the value manually",
        }
    }
}
