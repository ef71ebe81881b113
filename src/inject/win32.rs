//! Win32 clipboard and `SendInput` Ctrl+V.

use std::thread;
use std::time::Duration;

use windows::Win32::Foundation::{GlobalFree, HANDLE, HWND};
use windows::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
};
use windows::Win32::System::Memory::{GlobalAlloc, GlobalLock, GlobalUnlock, GMEM_MOVEABLE};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_CONTROL,
};

use super::Injector;
use crate::error::InjectionError;

/// `CF_UNICODETEXT` clipboard format.
const CF_UNICODETEXT: u32 = 13;

/// Another application may briefly hold the clipboard open.
const OPEN_ATTEMPTS: u32 = 5;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(10);

const VK_V: VIRTUAL_KEY = VIRTUAL_KEY(b'V' as u16);

pub struct Win32Injector;

impl Injector for Win32Injector {
    fn set_clipboard(&self, text: &str) -> Result<(), InjectionError> {
        let wide: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();

        open_clipboard()?;
        let result = unsafe { write_unicode_text(&wide) };
        unsafe {
            let _ = CloseClipboard();
        }
        result
    }

    fn simulate_paste(&self) -> Result<(), InjectionError> {
        let inputs = [
            key_input(VK_CONTROL, KEYBD_EVENT_FLAGS(0)),
            key_input(VK_V, KEYBD_EVENT_FLAGS(0)),
            key_input(VK_V, KEYEVENTF_KEYUP),
            key_input(VK_CONTROL, KEYEVENTF_KEYUP),
        ];

        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(InjectionError::Paste(format!(
                "SendInput accepted {} of {} key events",
                sent,
                inputs.len()
            )));
        }
        Ok(())
    }
}

fn open_clipboard() -> Result<(), InjectionError> {
    let mut last_error = String::new();
    for _ in 0..OPEN_ATTEMPTS {
        match unsafe { OpenClipboard(HWND::default()) } {
            Ok(()) => return Ok(()),
            Err(e) => last_error = e.to_string(),
        }
        thread::sleep(OPEN_RETRY_DELAY);
    }
    Err(InjectionError::Clipboard(format!(
        "OpenClipboard failed: {}",
        last_error
    )))
}

/// Replaces the clipboard content with NUL-terminated UTF-16 `wide`.
/// The clipboard must already be open.
unsafe fn write_unicode_text(wide: &[u16]) -> Result<(), InjectionError> {
    let clip_err = |what: &str, e: windows::core::Error| {
        InjectionError::Clipboard(format!("{} failed: {}", what, e))
    };

    unsafe {
        EmptyClipboard().map_err(|e| clip_err("EmptyClipboard", e))?;

        let bytes = std::mem::size_of_val(wide);
        let hmem = GlobalAlloc(GMEM_MOVEABLE, bytes).map_err(|e| clip_err("GlobalAlloc", e))?;

        let dst = GlobalLock(hmem) as *mut u16;
        if dst.is_null() {
            let _ = GlobalFree(hmem);
            return Err(InjectionError::Clipboard("GlobalLock failed".to_string()));
        }
        std::ptr::copy_nonoverlapping(wide.as_ptr(), dst, wide.len());
        let _ = GlobalUnlock(hmem);

        // On success the system owns the memory
        if let Err(e) = SetClipboardData(CF_UNICODETEXT, HANDLE(hmem.0)) {
            let _ = GlobalFree(hmem);
            return Err(clip_err("SetClipboardData", e));
        }
    }
    Ok(())
}

fn key_input(key: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: key,
                dwFlags: flags,
                ..Default::default()
            },
        },
    }
}
