//! Pointer position source used by calibration.

use anyhow::Result;

/// Reports the current mouse pointer position in virtual-screen pixels.
pub trait PointerSource: Send + Sync {
    fn position(&self) -> Result<(i32, i32)>;
}

/// Reads the system cursor with `GetCursorPos`.
#[cfg(windows)]
pub struct SystemPointer;

#[cfg(windows)]
impl PointerSource for SystemPointer {
    fn position(&self) -> Result<(i32, i32)> {
        use windows::Win32::Foundation::POINT;
        use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

        let mut pt = POINT::default();
        unsafe {
            GetCursorPos(&mut pt)?;
        }
        Ok((pt.x, pt.y))
    }
}

/// Pointer source for platforms without cursor access.
#[cfg_attr(windows, allow(dead_code))]
pub struct UnavailablePointer;

impl PointerSource for UnavailablePointer {
    fn position(&self) -> Result<(i32, i32)> {
        anyhow::bail!("pointer position is unavailable on {}", std::env::consts::OS)
    }
}

/// Returns the pointer source for the current platform.
pub fn default_pointer() -> Box<dyn PointerSource> {
    #[cfg(windows)]
    {
        Box::new(SystemPointer)
    }
    #[cfg(not(windows))]
    {
        Box::new(UnavailablePointer)
    }
}
