//! Delivering a price into the game's input field.
//!
//! The value always goes to the clipboard; with auto-paste on, a Ctrl+V
//! keystroke follows after a short settle delay.

#[cfg(windows)]
mod win32;

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::error::InjectionError;

#[cfg(windows)]
pub use win32::Win32Injector;

/// Pause between setting the clipboard and pasting, so the target
/// application sees the new clipboard content.
pub const PASTE_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Clipboard and keystroke backend.
pub trait Injector: Send + Sync {
    fn set_clipboard(&self, text: &str) -> Result<(), InjectionError>;
    fn simulate_paste(&self) -> Result<(), InjectionError>;
}

/// How far a value got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Copied and pasted into the focused field.
    Pasted,
    /// Only copied; the operator pastes manually.
    Copied,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Pasted => write!(f, "pasted"),
            Delivery::Copied => write!(f, "copied"),
        }
    }
}

/// Copies `value` to the clipboard and, if `auto_paste`, pastes it.
///
/// A clipboard failure is an error. A failed paste keystroke is not: the
/// value is already on the clipboard, so the result is `Copied`.
pub fn inject(
    injector: &dyn Injector,
    value: u64,
    auto_paste: bool,
) -> Result<Delivery, InjectionError> {
    injector.set_clipboard(&value.to_string())?;

    if !auto_paste {
        return Ok(Delivery::Copied);
    }

    thread::sleep(PASTE_SETTLE_DELAY);
    match injector.simulate_paste() {
        Ok(()) => Ok(Delivery::Pasted),
        Err(e) => {
            tracing::warn!("Paste failed, value left on clipboard: {}", e);
            Ok(Delivery::Copied)
        }
    }
}

/// Injector for platforms without clipboard support.
#[cfg_attr(windows, allow(dead_code))]
pub struct UnavailableInjector;

impl Injector for UnavailableInjector {
    fn set_clipboard(&self, _text: &str) -> Result<(), InjectionError> {
        Err(InjectionError::Unavailable)
    }

    fn simulate_paste(&self) -> Result<(), InjectionError> {
        Err(InjectionError::Unavailable)
    }
}

/// Returns the injector for the current platform.
pub fn default_injector() -> Box<dyn Injector> {
    #[cfg(windows)]
    {
        Box::new(Win32Injector)
    }
    #[cfg(not(windows))]
    {
        Box::new(UnavailableInjector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        paste_fails: bool,
    }

    impl Injector for Recorder {
        fn set_clipboard(&self, text: &str) -> Result<(), InjectionError> {
            self.calls.lock().unwrap().push(format!("clip:{}", text));
            Ok(())
        }

        fn simulate_paste(&self) -> Result<(), InjectionError> {
            self.calls.lock().unwrap().push("paste".to_string());
            if self.paste_fails {
                Err(InjectionError::Paste("no focus".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_auto_paste_copies_then_pastes() {
        let rec = Recorder::default();
        assert_eq!(inject(&rec, 4999, true).unwrap(), Delivery::Pasted);
        assert_eq!(*rec.calls.lock().unwrap(), vec!["clip:4999", "paste"]);
    }

    #[test]
    fn test_without_auto_paste_only_copies() {
        let rec = Recorder::default();
        assert_eq!(inject(&rec, 12, false).unwrap(), Delivery::Copied);
        assert_eq!(*rec.calls.lock().unwrap(), vec!["clip:12"]);
    }

    #[test]
    fn test_failed_paste_degrades_to_copied() {
        let rec = Recorder {
            paste_fails: true,
            ..Default::default()
        };
        assert_eq!(inject(&rec, 7, true).unwrap(), Delivery::Copied);
    }

    #[test]
    fn test_clipboard_failure_is_error() {
        assert!(matches!(
            inject(&UnavailableInjector, 7, true),
            Err(InjectionError::Unavailable)
        ));
    }
}
