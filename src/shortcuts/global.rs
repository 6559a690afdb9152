//! OS-level hotkey registration through `global-hotkey`.
//!
//! The registry owns which bindings exist; this bridge mirrors the valid
//! global pool into the OS and translates fired hotkeys back into
//! [`ShortcutEvent`]s. Registration is all-or-nothing per sync: on every
//! change the previous set is unregistered and the current pool registered
//! from scratch.

use std::collections::HashMap;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, warn};

use super::registry::{Shortcut, ShortcutEvent};

pub struct GlobalShortcuts {
    manager: GlobalHotKeyManager,
    registered: Vec<HotKey>,
    by_id: HashMap<u32, ShortcutEvent>,
}

impl GlobalShortcuts {
    pub fn new() -> Result<Self, global_hotkey::Error> {
        Ok(Self {
            manager: GlobalHotKeyManager::new()?,
            registered: Vec::new(),
            by_id: HashMap::new(),
        })
    }

    /// Mirror the given pool into the OS, replacing whatever was registered.
    /// Unparseable or invalid entries are skipped with a warning; a failed
    /// OS registration (keys grabbed by another program) likewise.
    pub fn sync(&mut self, pool: &[Shortcut]) {
        self.clear();
        for entry in pool {
            if entry.is_invalid() {
                continue;
            }
            let Some(keys) = entry.keys.as_deref() else {
                continue;
            };
            let Some(hotkey) = parse_accelerator(keys) else {
                warn!("cannot express {keys} as an OS hotkey, skipping");
                continue;
            };
            match self.manager.register(hotkey) {
                Ok(()) => {
                    debug!("registered global hotkey {keys}");
                    self.registered.push(hotkey);
                    self.by_id.insert(
                        hotkey.id(),
                        ShortcutEvent {
                            action: entry.action,
                            value: entry.value.clone(),
                        },
                    );
                }
                Err(err) => warn!("failed to register global hotkey {keys}: {err}"),
            }
        }
    }

    /// Unregister everything. Used while the editor is open so captures do
    /// not trigger live bindings.
    pub fn clear(&mut self) {
        for hotkey in self.registered.drain(..) {
            if let Err(err) = self.manager.unregister(hotkey) {
                warn!("failed to unregister global hotkey: {err}");
            }
        }
        self.by_id.clear();
    }

    /// Drain fired hotkeys into events. Non-blocking.
    pub fn poll(&mut self) -> Vec<ShortcutEvent> {
        let mut fired = Vec::new();
        while let Ok(ev) = GlobalHotKeyEvent::receiver().try_recv() {
            if ev.state() != HotKeyState::Pressed {
                continue;
            }
            if let Some(event) = self.by_id.get(&ev.id()) {
                fired.push(event.clone());
            }
        }
        fired
    }
}

impl Drop for GlobalShortcuts {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Parse an accelerator string into an OS hotkey. Returns `None` for key
/// names with no OS-level equivalent.
pub(crate) fn parse_accelerator(accel: &str) -> Option<HotKey> {
    let mut mods = Modifiers::empty();
    let mut code = None;
    for part in accel.split('+') {
        match part {
            "Control" => mods |= Modifiers::CONTROL,
            "Shift" => mods |= Modifiers::SHIFT,
            "Alt" => mods |= Modifiers::ALT,
            "Super" => mods |= Modifiers::SUPER,
            other => {
                if code.is_some() {
                    return None;
                }
                code = Some(key_code(other)?);
            }
        }
    }
    let code = code?;
    let mods = if mods.is_empty() { None } else { Some(mods) };
    Some(HotKey::new(mods, code))
}

fn key_code(name: &str) -> Option<Code> {
    let code = match name {
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,
        "Space" => Code::Space,
        "Enter" => Code::Enter,
        "Escape" => Code::Escape,
        "Tab" => Code::Tab,
        "Backspace" => Code::Backspace,
        "Delete" => Code::Delete,
        "Insert" => Code::Insert,
        "Home" => Code::Home,
        "End" => Code::End,
        "PageUp" => Code::PageUp,
        "PageDown" => Code::PageDown,
        "ArrowUp" => Code::ArrowUp,
        "ArrowDown" => Code::ArrowDown,
        "ArrowLeft" => Code::ArrowLeft,
        "ArrowRight" => Code::ArrowRight,
        "plus" => Code::Equal,
        "MediaPlayPause" => Code::MediaPlayPause,
        "MediaNextTrack" => Code::MediaTrackNext,
        "MediaPreviousTrack" => Code::MediaTrackPrevious,
        "MediaStop" => Code::MediaStop,
        "num0" => Code::Numpad0,
        "num1" => Code::Numpad1,
        "num2" => Code::Numpad2,
        "num3" => Code::Numpad3,
        "num4" => Code::Numpad4,
        "num5" => Code::Numpad5,
        "num6" => Code::Numpad6,
        "num7" => Code::Numpad7,
        "num8" => Code::Numpad8,
        "num9" => Code::Numpad9,
        "numadd" => Code::NumpadAdd,
        "numsub" => Code::NumpadSubtract,
        "nummult" => Code::NumpadMultiply,
        "numdiv" => Code::NumpadDivide,
        "numdec" => Code::NumpadDecimal,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accelerator_parsing_covers_modifiers_and_keypad() {
        let hk = parse_accelerator("Control+Shift+A").unwrap();
        assert_eq!(
            hk,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyA)
        );

        let hk = parse_accelerator("numadd").unwrap();
        assert_eq!(hk, HotKey::new(None, Code::NumpadAdd));

        let hk = parse_accelerator("MediaNextTrack").unwrap();
        assert_eq!(hk, HotKey::new(None, Code::MediaTrackNext));
    }

    #[test]
    fn accelerator_parsing_rejects_modifier_only_and_unknown_keys() {
        assert!(parse_accelerator("Control+Shift").is_none());
        assert!(parse_accelerator("Control+Hyper").is_none());
        assert!(parse_accelerator("A+B").is_none());
    }
}
