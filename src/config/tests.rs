use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use crate::library::Track;
use crate::shortcuts::{Shortcut, ShortcutAction};

use super::settings::*;
use super::store::*;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_botboard_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("BOTBOARD_CONFIG_PATH", "/tmp/botboard-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        PathBuf::from("/tmp/botboard-test-config.toml")
    );
}

#[test]
fn default_paths_prefer_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/xdg-config-home")
            .join("botboard")
            .join("config.toml")
    );
    assert_eq!(
        default_state_path().unwrap(),
        PathBuf::from("/tmp/xdg-config-home")
            .join("botboard")
            .join("state.json")
    );
}

#[test]
fn default_paths_fall_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("botboard")
            .join("config.toml")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[player]
prune_queue_on_remove = true

[audio]
finish_poll_ms = 50

[ui]
tick_ms = 25
header_text = "hello"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("BOTBOARD_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("BOTBOARD__AUDIO__FINISH_POLL_MS");

    let s = Settings::load().unwrap();
    assert!(s.player.prune_queue_on_remove);
    assert_eq!(s.audio.finish_poll_ms, 50);
    assert_eq!(s.ui.tick_ms, 25);
    assert_eq!(s.ui.header_text, "hello");
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
finish_poll_ms = 50
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("BOTBOARD_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("BOTBOARD__AUDIO__FINISH_POLL_MS", "75");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.finish_poll_ms, 75);
}

#[test]
fn settings_validation_rejects_zero_intervals() {
    let mut s = Settings::default();
    s.audio.finish_poll_ms = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.ui.tick_ms = 0;
    assert!(s.validate().is_err());
}

fn sample_state() -> AppState {
    AppState {
        tracks: vec![Track {
            path: PathBuf::from("/sounds/horn.mp3"),
            name: "horn".into(),
            key: Some("F5".into()),
        }],
        local_shortcuts: vec![Shortcut::new("F2", ShortcutAction::Quit)],
        global_shortcuts: vec![Shortcut {
            keys: Some("F5".into()),
            action: ShortcutAction::PlayTrack,
            value: Some("/sounds/horn.mp3".into()),
        }],
        token: Some("secret".into()),
    }
}

#[test]
fn app_state_round_trips_through_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let state = sample_state();
    state.save(&path).unwrap();
    assert_eq!(AppState::load(&path), state);
}

#[test]
fn app_state_serializes_camel_case_field_names() {
    let json = serde_json::to_string(&sample_state()).unwrap();
    assert!(json.contains("\"localShortcuts\""));
    assert!(json.contains("\"globalShortcuts\""));
    assert!(json.contains("\"tracks\""));

    // No token entry at all when none is saved.
    let json = serde_json::to_string(&AppState::default()).unwrap();
    assert!(!json.contains("token"));
}

#[test]
fn missing_or_corrupt_state_loads_as_default() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("absent.json");
    assert_eq!(AppState::load(&missing), AppState::default());

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{ not json").unwrap();
    assert_eq!(AppState::load(&corrupt), AppState::default());
}

#[test]
fn unknown_state_fields_are_tolerated() {
    let state: AppState =
        serde_json::from_str(r#"{"tracks": [], "windowBounds": {"width": 800}}"#).unwrap();
    assert_eq!(state, AppState::default());
}
