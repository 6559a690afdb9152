use std::sync::mpsc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

use super::*;

fn press(key: &str, numpad: bool, ctrl: bool, shift: bool, alt: bool, meta: bool) -> KeyPress {
    KeyPress {
        key: key.into(),
        numpad,
        ctrl,
        shift,
        alt,
        meta,
    }
}

#[test]
fn encoding_orders_modifiers_and_uppercases_letters() {
    let accel = encode(&press("a", false, true, true, false, false));
    assert_eq!(accel.as_deref(), Some("Control+Shift+A"));

    let accel = encode(&press("x", false, false, false, true, true));
    assert_eq!(accel.as_deref(), Some("Alt+Super+X"));
}

#[test]
fn encoding_maps_keypad_keys_to_num_names() {
    assert_eq!(encode(&press("+", true, false, false, false, false)).as_deref(), Some("numadd"));
    assert_eq!(encode(&press("-", true, false, false, false, false)).as_deref(), Some("numsub"));
    assert_eq!(encode(&press("*", true, false, false, false, false)).as_deref(), Some("nummult"));
    assert_eq!(encode(&press("/", true, false, false, false, false)).as_deref(), Some("numdiv"));
    assert_eq!(encode(&press(".", true, false, false, false, false)).as_deref(), Some("numdec"));
    assert_eq!(encode(&press("7", true, false, false, false, false)).as_deref(), Some("num7"));
}

#[test]
fn encoding_handles_special_spellings() {
    assert_eq!(encode(&press("+", false, false, false, false, false)).as_deref(), Some("plus"));
    assert_eq!(encode(&press(" ", false, false, false, false, false)).as_deref(), Some("Space"));
    assert_eq!(
        encode(&press("Meta", false, false, false, false, true)).as_deref(),
        None,
        "a meta press alone is still just a modifier"
    );
    assert_eq!(
        encode(&press("Escape", false, false, false, false, false)).as_deref(),
        Some("Escape")
    );
}

#[test]
fn modifier_only_presses_never_encode() {
    assert!(encode(&press("Control", false, true, false, false, false)).is_none());
    assert!(encode(&press("Shift", false, false, true, false, false)).is_none());
    assert!(encode(&press("Super", false, false, false, false, true)).is_none());
    assert!(encode(&press("Alt", false, true, true, true, true)).is_none());
}

#[test]
fn key_events_translate_with_keypad_state_and_meta() {
    let ev = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
    let p = keypress_from_event(&ev).unwrap();
    assert_eq!(encode(&p).as_deref(), Some("Control+A"));

    let mut ev = KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE);
    ev.state = KeyEventState::KEYPAD;
    let p = keypress_from_event(&ev).unwrap();
    assert_eq!(encode(&p).as_deref(), Some("numadd"));

    let ev = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::SUPER);
    let p = keypress_from_event(&ev).unwrap();
    assert_eq!(encode(&p).as_deref(), Some("Super+S"));
}

#[test]
fn invalid_bindings_are_detected() {
    let valid = Shortcut::new("Control+P", ShortcutAction::TogglePause);
    assert!(!valid.is_invalid());

    assert!(Shortcut::new("", ShortcutAction::Quit).is_invalid());
    assert!(Shortcut::new("Control+Shift", ShortcutAction::Quit).is_invalid());
    assert!(Shortcut::new(ALREADY_USED, ShortcutAction::Quit).is_invalid());
    assert!(
        Shortcut {
            keys: None,
            action: ShortcutAction::Quit,
            value: None,
        }
        .is_invalid()
    );

    // Play-track without a track is unusable no matter the keys.
    assert!(
        Shortcut {
            keys: Some("F5".into()),
            action: ShortcutAction::PlayTrack,
            value: None,
        }
        .is_invalid()
    );
}

#[test]
fn defaults_are_present_in_a_fresh_registry() {
    let reg = ShortcutRegistry::from_state(&[], &[]);
    assert!(
        reg.local_merged()
            .iter()
            .any(|s| s.action == ShortcutAction::Quit && s.keys.as_deref() == Some("Control+Q"))
    );
    assert!(reg.global_merged().iter().any(
        |s| s.action == ShortcutAction::TogglePause && s.keys.as_deref() == Some("MediaPlayPause")
    ));
    assert_eq!(reg.all_merged().len(), 6);
}

#[test]
fn user_entries_override_defaults_by_identity() {
    let user_local = vec![Shortcut::new("F2", ShortcutAction::Quit)];
    let user_global = vec![Shortcut {
        keys: Some("F5".into()),
        action: ShortcutAction::PlayTrack,
        value: Some("/sounds/horn.mp3".into()),
    }];
    let reg = ShortcutRegistry::from_state(&user_local, &user_global);

    let quit = reg
        .local_merged()
        .iter()
        .find(|s| s.action == ShortcutAction::Quit)
        .unwrap();
    assert_eq!(quit.keys.as_deref(), Some("F2"));
    // Overriding replaces; the default binding is gone.
    assert_eq!(
        reg.local_merged()
            .iter()
            .filter(|s| s.action == ShortcutAction::Quit)
            .count(),
        1
    );

    // Play-track entries extend the global pool rather than replacing each
    // other: identity there is action plus value.
    assert_eq!(reg.global_merged().len(), 4);

    let (local, global) = reg.user_pools();
    assert_eq!(local, user_local);
    assert_eq!(global, user_global);
}

#[test]
fn binding_a_taken_accelerator_writes_the_conflict_sentinel() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);

    let outcome = reg.try_bind(Pool::Local, ShortcutAction::Quit, None, "Control+M");
    assert_eq!(outcome, BindOutcome::AlreadyUsed);
    let quit = reg
        .local_merged()
        .iter()
        .find(|s| s.action == ShortcutAction::Quit)
        .unwrap();
    assert_eq!(quit.keys.as_deref(), Some(ALREADY_USED));
    assert!(quit.is_invalid());

    // Re-entering the keys an entry already owns is not a conflict.
    let outcome = reg.try_bind(Pool::Local, ShortcutAction::EditShortcuts, None, "Control+M");
    assert_eq!(outcome, BindOutcome::Bound);

    // A fresh accelerator resolves the conflict.
    let outcome = reg.try_bind(Pool::Local, ShortcutAction::Quit, None, "F2");
    assert_eq!(outcome, BindOutcome::Bound);
    assert!(!reg.has_invalid_global());
}

#[test]
fn cross_pool_conflicts_are_detected() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);
    let outcome = reg.try_bind(
        Pool::Global,
        ShortcutAction::PlayTrack,
        Some("/sounds/horn.mp3"),
        "Control+Q",
    );
    assert_eq!(outcome, BindOutcome::AlreadyUsed);
    assert!(reg.has_invalid_global());
}

#[test]
fn prune_drops_invalid_entries_and_marks_dirty() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);
    reg.try_bind(Pool::Global, ShortcutAction::PlayTrack, Some("/s/a.mp3"), "Control+Q");
    reg.clear_dirty();

    assert!(reg.has_invalid_global());
    reg.prune_invalid();
    assert!(!reg.has_invalid_global());
    assert_eq!(reg.global_merged().len(), 3);
    assert!(reg.dirty());
}

#[test]
fn handle_key_dispatches_to_subscribers_and_respects_suspension() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);
    let (tx, rx) = mpsc::channel();
    reg.subscribe(tx);

    assert!(reg.handle_key("Control+Q"));
    assert_eq!(
        rx.try_recv().unwrap(),
        ShortcutEvent {
            action: ShortcutAction::Quit,
            value: None,
        }
    );

    assert!(!reg.handle_key("Control+Z"));
    assert!(rx.try_recv().is_err());

    reg.set_suspended(true);
    assert!(!reg.handle_key("Control+Q"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn dead_subscribers_are_dropped_on_publish() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);
    let (dead_tx, dead_rx) = mpsc::channel();
    let (live_tx, live_rx) = mpsc::channel();
    reg.subscribe(dead_tx);
    reg.subscribe(live_tx);
    drop(dead_rx);

    reg.publish(ShortcutEvent {
        action: ShortcutAction::SkipTrack,
        value: None,
    });
    assert_eq!(live_rx.try_recv().unwrap().action, ShortcutAction::SkipTrack);
}

#[test]
fn remove_play_track_drops_the_binding_and_marks_dirty() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);
    reg.try_bind(Pool::Global, ShortcutAction::PlayTrack, Some("/s/a.mp3"), "F5");
    reg.clear_dirty();

    reg.remove_play_track("/s/a.mp3");
    assert_eq!(reg.key_for_track(std::path::Path::new("/s/a.mp3")), None);
    assert_eq!(reg.global_merged().len(), 3);
    assert!(reg.dirty());

    // Removing an unbound path changes nothing.
    reg.clear_dirty();
    reg.remove_play_track("/s/b.mp3");
    assert!(!reg.dirty());
}

#[test]
fn key_for_track_finds_valid_play_bindings() {
    let mut reg = ShortcutRegistry::from_state(&[], &[]);
    reg.try_bind(Pool::Global, ShortcutAction::PlayTrack, Some("/s/a.mp3"), "F5");

    assert_eq!(
        reg.key_for_track(std::path::Path::new("/s/a.mp3")),
        Some("F5")
    );
    assert_eq!(reg.key_for_track(std::path::Path::new("/s/b.mp3")), None);
}

#[test]
fn shortcut_serialization_uses_display_names() {
    let entry = Shortcut {
        keys: Some("F5".into()),
        action: ShortcutAction::PlayTrack,
        value: Some("/s/a.mp3".into()),
    };
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"keys":"F5","action":"Play track","value":"/s/a.mp3"}"#);

    let back: Shortcut = serde_json::from_str(&json).unwrap();
    assert_eq!(back, entry);
}
