pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{MissingEngine, OcrEngine, TesseractCli};
pub use extract::{parse_price, recognize};
pub use preprocess::normalize;
pub use setup::ensure_tesseract;

use crate::capture::PixelBuffer;
use crate::error::RecognitionError;

/// High-level function: captured pixels -> price.
///
/// Normalizes the capture, then runs the digit-only OCR pass.
pub fn read_price(
    engine: &dyn OcrEngine,
    pixels: &PixelBuffer,
) -> Result<Option<u64>, RecognitionError> {
    let binary = normalize(pixels);
    recognize(engine, &binary)
}

/// Builds the OCR engine for this machine.
///
/// A failed setup is logged and replaced by an engine that reports the
/// failure on every read, so the rest of the tool keeps working.
pub fn default_engine() -> Box<dyn OcrEngine> {
    match ensure_tesseract() {
        Ok(paths) => Box::new(TesseractCli::new(
            paths.executable,
            Some(paths.tessdata),
            engine::DEFAULT_TIMEOUT,
        )),
        Err(e) => {
            tracing::error!("OCR setup failed: {:#}", e);
            Box::new(MissingEngine::new(format!("{:#}", e)))
        }
    }
}
