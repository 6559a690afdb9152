//! Canonical accelerator encoding.
//!
//! Every captured key press is rendered as a `+`-joined accelerator string
//! with modifiers in the fixed order Control, Shift, Alt, Super. Both the
//! registry (for matching) and the editor (for display and persistence) go
//! through this one encoding so the same press always produces the same
//! string.

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventState, KeyModifiers, MediaKeyCode, ModifierKeyCode,
};

/// A key press reduced to the parts the accelerator encoding cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Main key name, already in its platform-neutral spelling ("A", "F5",
    /// "Escape", "MediaPlayPause", or a bare modifier name).
    pub key: String,
    /// The press came from the numeric keypad.
    pub numpad: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Encode a press as an accelerator string, or `None` when only modifiers are
/// held (a bare modifier press never forms a valid accelerator on its own,
/// but the partial string is still useful for live editor feedback, so the
/// caller decides; here `None` strictly means "no main key").
pub fn encode(press: &KeyPress) -> Option<String> {
    let mut parts: Vec<&str> = Vec::with_capacity(5);
    if press.ctrl {
        parts.push("Control");
    }
    if press.shift {
        parts.push("Shift");
    }
    if press.alt {
        parts.push("Alt");
    }
    if press.meta {
        parts.push("Super");
    }

    let key = key_name(&press.key, press.numpad);
    if !parts.iter().any(|p| *p == key) {
        parts.push(&key);
    }

    if parts.iter().all(|p| is_modifier_name(p)) {
        return None;
    }
    Some(parts.join("+"))
}

fn is_modifier_name(name: &str) -> bool {
    matches!(name, "Control" | "Shift" | "Alt" | "Super")
}

/// Platform-neutral spelling of a main key.
fn key_name(key: &str, numpad: bool) -> String {
    if numpad {
        // Keypad keys carry a num prefix so they bind separately from their
        // main-row twins.
        return match key {
            "+" => "numadd".into(),
            "-" => "numsub".into(),
            "*" => "nummult".into(),
            "/" => "numdiv".into(),
            "." => "numdec".into(),
            other => format!("num{other}"),
        };
    }
    match key {
        "+" => "plus".into(),
        " " => "Space".into(),
        "Meta" => "Super".into(),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() => c.to_ascii_uppercase().to_string(),
                _ => other.into(),
            }
        }
    }
}

/// Translate a terminal key event into a [`KeyPress`], or `None` for keys
/// that can never take part in an accelerator.
pub fn keypress_from_event(ev: &KeyEvent) -> Option<KeyPress> {
    let key = match ev.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".into(),
        KeyCode::Esc => "Escape".into(),
        KeyCode::Tab => "Tab".into(),
        KeyCode::Backspace => "Backspace".into(),
        KeyCode::Delete => "Delete".into(),
        KeyCode::Up => "ArrowUp".into(),
        KeyCode::Down => "ArrowDown".into(),
        KeyCode::Left => "ArrowLeft".into(),
        KeyCode::Right => "ArrowRight".into(),
        KeyCode::Home => "Home".into(),
        KeyCode::End => "End".into(),
        KeyCode::PageUp => "PageUp".into(),
        KeyCode::PageDown => "PageDown".into(),
        KeyCode::Insert => "Insert".into(),
        KeyCode::F(n) => format!("F{n}"),
        KeyCode::Media(media) => match media {
            MediaKeyCode::PlayPause | MediaKeyCode::Play | MediaKeyCode::Pause => {
                "MediaPlayPause".into()
            }
            MediaKeyCode::TrackNext => "MediaNextTrack".into(),
            MediaKeyCode::TrackPrevious => "MediaPreviousTrack".into(),
            MediaKeyCode::Stop => "MediaStop".into(),
            _ => return None,
        },
        KeyCode::Modifier(m) => match m {
            ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "Control".into(),
            ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "Shift".into(),
            ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "Alt".into(),
            ModifierKeyCode::LeftSuper
            | ModifierKeyCode::RightSuper
            | ModifierKeyCode::LeftMeta
            | ModifierKeyCode::RightMeta => "Super".into(),
            _ => return None,
        },
        _ => return None,
    };

    Some(KeyPress {
        key,
        numpad: ev.state.contains(KeyEventState::KEYPAD),
        ctrl: ev.modifiers.contains(KeyModifiers::CONTROL),
        shift: ev.modifiers.contains(KeyModifiers::SHIFT),
        alt: ev.modifiers.contains(KeyModifiers::ALT),
        meta: ev.modifiers.contains(KeyModifiers::META)
            || ev.modifiers.contains(KeyModifiers::SUPER),
    })
}
