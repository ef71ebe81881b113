use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetMessageW, PeekMessageW, PostThreadMessageW, MSG, PM_NOREMOVE, WM_HOTKEY, WM_QUIT, WM_USER,
};

use super::{Binding, Hotkey};
use crate::events::EventSender;

/// Running hotkey thread. Dropping it unregisters the hotkeys.
pub struct HotkeyListener {
    thread_id: u32,
    handle: Option<JoinHandle<()>>,
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn modifiers(hotkey: &Hotkey) -> HOT_KEY_MODIFIERS {
    let mut mods = MOD_NOREPEAT;
    if hotkey.ctrl {
        mods = mods | MOD_CONTROL;
    }
    if hotkey.alt {
        mods = mods | MOD_ALT;
    }
    if hotkey.shift {
        mods = mods | MOD_SHIFT;
    }
    mods
}

/// Starts the listener thread and registers every binding.
///
/// A hotkey already taken by another program is logged and skipped; the
/// listener fails only if no binding could be registered.
pub fn spawn_listener(sender: EventSender, table: Vec<Binding>) -> Result<HotkeyListener> {
    let (ready_tx, ready_rx) = mpsc::channel::<(u32, usize)>();

    let handle = thread::Builder::new()
        .name("hotkeys".to_string())
        .spawn(move || {
            let mut msg = MSG::default();
            unsafe {
                // Create this thread's message queue before reporting ready
                let _ = PeekMessageW(&mut msg, HWND::default(), WM_USER, WM_USER, PM_NOREMOVE);
            }

            let mut registered = Vec::new();
            for (id, binding) in table.iter().enumerate() {
                let id = id as i32 + 1;
                let result = unsafe {
                    RegisterHotKey(
                        HWND::default(),
                        id,
                        modifiers(&binding.hotkey),
                        binding.hotkey.key.vk_code(),
                    )
                };
                match result {
                    Ok(()) => registered.push((id, binding.event)),
                    Err(e) => tracing::warn!(hotkey = %binding.hotkey, "Hotkey registration failed: {}", e),
                }
            }

            let thread_id = unsafe { GetCurrentThreadId() };
            let _ = ready_tx.send((thread_id, registered.len()));
            if registered.is_empty() {
                return;
            }

            unsafe {
                while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
                    if msg.message != WM_HOTKEY {
                        continue;
                    }
                    let id = msg.wParam.0 as i32;
                    if let Some(&(_, event)) = registered.iter().find(|(rid, _)| *rid == id) {
                        tracing::debug!(%event, "hotkey pressed");
                        sender.post(event);
                    }
                }

                for (id, _) in &registered {
                    let _ = UnregisterHotKey(HWND::default(), *id);
                }
            }
        })?;

    let (thread_id, count) = ready_rx
        .recv()
        .map_err(|_| anyhow!("hotkey thread exited during startup"))?;

    if count == 0 {
        let _ = handle.join();
        return Err(anyhow!("no hotkey could be registered"));
    }

    tracing::info!(count, "Hotkeys registered");
    Ok(HotkeyListener {
        thread_id,
        handle: Some(handle),
    })
}
