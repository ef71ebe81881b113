//! Global hotkeys.
//!
//! The binding table is plain data so it can be shown in the form and
//! tested anywhere. The Windows listener registers each binding with
//! `RegisterHotKey` on a dedicated thread and posts the matching event to
//! the event queue.

#[cfg(windows)]
mod win32;

use std::fmt;

use crate::events::Event;
use crate::pricing::Tier;

#[cfg(windows)]
pub use win32::{spawn_listener, HotkeyListener};

/// Keys used by the bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    F1,
    F2,
    F3,
    F4,
    P,
    M,
    Escape,
}

impl Key {
    /// Windows virtual-key code.
    pub fn vk_code(self) -> u32 {
        match self {
            Key::F1 => 0x70,
            Key::F2 => 0x71,
            Key::F3 => 0x72,
            Key::F4 => 0x73,
            Key::P => 0x50,
            Key::M => 0x4D,
            Key::Escape => 0x1B,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::F1 => "F1",
            Key::F2 => "F2",
            Key::F3 => "F3",
            Key::F4 => "F4",
            Key::P => "P",
            Key::M => "M",
            Key::Escape => "Esc",
        };
        f.write_str(name)
    }
}

/// Key plus modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: Key,
}

impl Hotkey {
    pub const fn plain(key: Key) -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: false,
            key,
        }
    }

    pub const fn ctrl_alt(key: Key) -> Self {
        Self {
            ctrl: true,
            alt: true,
            shift: false,
            key,
        }
    }

    pub const fn ctrl_shift(key: Key) -> Self {
        Self {
            ctrl: true,
            alt: false,
            shift: true,
            key,
        }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// One hotkey and the event it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub hotkey: Hotkey,
    pub event: Event,
}

fn tier_key(tier: Tier) -> Key {
    match tier {
        Tier::One => Key::F1,
        Tier::Ten => Key::F2,
        Tier::Hundred => Key::F3,
    }
}

/// The full trigger set. `with_quit` adds Esc, which only the headless loop
/// uses; the form closes through its window instead.
pub fn bindings(with_quit: bool) -> Vec<Binding> {
    let mut table = Vec::new();

    for tier in Tier::ALL {
        table.push(Binding {
            hotkey: Hotkey::plain(tier_key(tier)),
            event: Event::ReadPaste(tier),
        });
    }
    table.push(Binding {
        hotkey: Hotkey::plain(Key::F4),
        event: Event::Optimize,
    });
    for tier in Tier::ALL {
        table.push(Binding {
            hotkey: Hotkey::ctrl_alt(tier_key(tier)),
            event: Event::Calibrate(tier),
        });
    }
    table.push(Binding {
        hotkey: Hotkey::ctrl_shift(Key::P),
        event: Event::PrintAll,
    });
    table.push(Binding {
        hotkey: Hotkey::ctrl_shift(Key::M),
        event: Event::ShowPointer,
    });
    if with_quit {
        table.push(Binding {
            hotkey: Hotkey::plain(Key::Escape),
            event: Event::Quit,
        });
    }

    table
}

/// One-line summary of `table` for the log and the form footer.
pub fn describe(table: &[Binding]) -> String {
    table
        .iter()
        .map(|b| format!("{}={}", b.hotkey, b.event))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Global hotkeys are a Windows feature; elsewhere the listener cannot start.
#[cfg(not(windows))]
pub struct HotkeyListener;

#[cfg(not(windows))]
pub fn spawn_listener(
    _sender: crate::events::EventSender,
    _table: Vec<Binding>,
) -> anyhow::Result<HotkeyListener> {
    anyhow::bail!("global hotkeys are only supported on Windows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn event_for(table: &[Binding], hotkey: Hotkey) -> Option<Event> {
        table.iter().find(|b| b.hotkey == hotkey).map(|b| b.event)
    }

    #[test]
    fn test_trigger_set() {
        let table = bindings(true);
        assert_eq!(event_for(&table, Hotkey::plain(Key::F1)), Some(Event::ReadPaste(Tier::One)));
        assert_eq!(
            event_for(&table, Hotkey::plain(Key::F3)),
            Some(Event::ReadPaste(Tier::Hundred))
        );
        assert_eq!(event_for(&table, Hotkey::plain(Key::F4)), Some(Event::Optimize));
        assert_eq!(
            event_for(&table, Hotkey::ctrl_alt(Key::F2)),
            Some(Event::Calibrate(Tier::Ten))
        );
        assert_eq!(event_for(&table, Hotkey::ctrl_shift(Key::P)), Some(Event::PrintAll));
        assert_eq!(event_for(&table, Hotkey::ctrl_shift(Key::M)), Some(Event::ShowPointer));
        assert_eq!(event_for(&table, Hotkey::plain(Key::Escape)), Some(Event::Quit));
    }

    #[test]
    fn test_quit_only_when_requested() {
        let table = bindings(false);
        assert_eq!(table.len(), 9);
        assert!(table.iter().all(|b| b.event != Event::Quit));
    }

    #[test]
    fn test_hotkeys_are_unique() {
        let table = bindings(true);
        let distinct: HashSet<Hotkey> = table.iter().map(|b| b.hotkey).collect();
        assert_eq!(distinct.len(), table.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(Hotkey::ctrl_alt(Key::F1).to_string(), "Ctrl+Alt+F1");
        assert_eq!(Hotkey::ctrl_shift(Key::P).to_string(), "Ctrl+Shift+P");
        assert!(describe(&bindings(false)).starts_with("F1=read lot 1 | F2=read lot 10"));
    }
}
