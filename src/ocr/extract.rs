use std::sync::LazyLock;

use image::GrayImage;
use regex::Regex;

use super::engine::OcrEngine;
use crate::error::RecognitionError;

/// Characters the engine is allowed to emit.
pub const DIGIT_WHITELIST: &str = "0123456789";

static NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]+").expect("literal pattern compiles"));

/// Turns raw OCR text into a price.
///
/// Every non-digit character is dropped first, so thousands separators,
/// currency glyphs and stray whitespace do not matter. No digits at all, or a
/// digit string too long for `u64`, yields `None`.
pub fn parse_price(text: &str) -> Option<u64> {
    let digits = NON_DIGITS.replace_all(text, "");
    if digits.is_empty() {
        return None;
    }

    match digits.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(digits = %digits, "recognized number does not fit in 64 bits, ignoring");
            None
        }
    }
}

/// Runs a digit-only OCR pass over a normalized image.
///
/// Unreadable text is an absent price, not an error; only engine failures
/// are reported as `RecognitionError`.
pub fn recognize(engine: &dyn OcrEngine, img: &GrayImage) -> Result<Option<u64>, RecognitionError> {
    let text = engine.read_text(img, DIGIT_WHITELIST)?;
    let price = parse_price(&text);
    tracing::debug!(text = %text.trim(), ?price, "OCR result");
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedText(&'static str);

    impl OcrEngine for FixedText {
        fn read_text(&self, _img: &GrayImage, whitelist: &str) -> Result<String, RecognitionError> {
            assert_eq!(whitelist, DIGIT_WHITELIST);
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_price_strips_noise() {
        assert_eq!(parse_price("12,345\n"), Some(12345));
        assert_eq!(parse_price(" 1 234 567 "), Some(1_234_567));
        assert_eq!(parse_price("$99.00"), Some(9900));
        assert_eq!(parse_price("007"), Some(7));
    }

    #[test]
    fn test_parse_price_absent() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("  \n\x0c"), None);
        assert_eq!(parse_price("--"), None);
    }

    #[test]
    fn test_parse_price_overflow_is_absent() {
        assert_eq!(parse_price("18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_price("18446744073709551616"), None);
        assert_eq!(parse_price("999999999999999999999999"), None);
    }

    #[test]
    fn test_recognize_blank_image_is_absent_not_error() {
        let img = GrayImage::from_pixel(20, 10, image::Luma([255]));
        assert_eq!(recognize(&FixedText(""), &img).unwrap(), None);
        assert_eq!(recognize(&FixedText("\n"), &img).unwrap(), None);
    }

    #[test]
    fn test_recognize_reads_digits() {
        let img = GrayImage::new(20, 10);
        assert_eq!(recognize(&FixedText("4500\n"), &img).unwrap(), Some(4500));
    }
}
