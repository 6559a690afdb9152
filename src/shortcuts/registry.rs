//! The shortcut registry: defaults, user overrides, validation, conflict
//! detection and decoupled dispatch.

use std::path::Path;
use std::sync::mpsc::Sender;

use log::debug;
use serde::{Deserialize, Serialize};

/// Sentinel written into a binding's accelerator when another binding already
/// claims the same keys. An entry carrying it is invalid until rebound.
pub const ALREADY_USED: &str = "Already used";

/// Everything a shortcut can trigger. The serialized names double as the
/// labels shown in the editor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortcutAction {
    #[serde(rename = "Toggle pause")]
    TogglePause,
    #[serde(rename = "Skip track")]
    SkipTrack,
    #[serde(rename = "Stop player")]
    StopPlayer,
    #[serde(rename = "Edit shortcuts")]
    EditShortcuts,
    #[serde(rename = "Import tracks")]
    ImportTracks,
    #[serde(rename = "Quit")]
    Quit,
    #[serde(rename = "Play track")]
    PlayTrack,
}

impl ShortcutAction {
    pub fn label(self) -> &'static str {
        match self {
            ShortcutAction::TogglePause => "Toggle pause",
            ShortcutAction::SkipTrack => "Skip track",
            ShortcutAction::StopPlayer => "Stop player",
            ShortcutAction::EditShortcuts => "Edit shortcuts",
            ShortcutAction::ImportTracks => "Import tracks",
            ShortcutAction::Quit => "Quit",
            ShortcutAction::PlayTrack => "Play track",
        }
    }
}

/// One binding: an accelerator, the action it triggers and an optional value
/// (the track path for play-track bindings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
    pub action: ShortcutAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Shortcut {
    pub fn new(keys: &str, action: ShortcutAction) -> Self {
        Self {
            keys: Some(keys.into()),
            action,
            value: None,
        }
    }

    /// A binding is invalid when it has no accelerator, when the accelerator
    /// is all modifiers (or the conflict sentinel), or when a play-track
    /// binding lost its value.
    pub fn is_invalid(&self) -> bool {
        if self.action == ShortcutAction::PlayTrack && self.value.is_none() {
            return true;
        }
        let Some(keys) = self.keys.as_deref() else {
            return true;
        };
        if keys.is_empty() {
            return true;
        }
        keys.split('+')
            .all(|part| matches!(part, "Super" | "Alt" | "Shift" | "Control" | ALREADY_USED))
    }
}

/// Which pool a binding lives in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pool {
    /// Fires only while the application has focus.
    Local,
    /// Registered with the OS, fires anywhere.
    Global,
}

/// What subscribers receive when a shortcut fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutEvent {
    pub action: ShortcutAction,
    pub value: Option<String>,
}

/// Outcome of binding an accelerator in the editor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// Another binding claims the same keys; the entry now carries the
    /// conflict sentinel.
    AlreadyUsed,
}

pub struct ShortcutRegistry {
    local: Vec<Shortcut>,
    global: Vec<Shortcut>,
    subscribers: Vec<Sender<ShortcutEvent>>,
    suspended: bool,
    dirty: bool,
}

impl ShortcutRegistry {
    /// Build from persisted user pools, merged over the defaults.
    pub fn from_state(local: &[Shortcut], global: &[Shortcut]) -> Self {
        Self {
            local: merge(defaults(Pool::Local), local, Pool::Local),
            global: merge(defaults(Pool::Global), global, Pool::Global),
            subscribers: Vec::new(),
            suspended: false,
            dirty: false,
        }
    }

    pub fn local_merged(&self) -> &[Shortcut] {
        &self.local
    }

    pub fn global_merged(&self) -> &[Shortcut] {
        &self.global
    }

    /// Both pools, locals first. The editor lists exactly this.
    pub fn all_merged(&self) -> Vec<(Pool, &Shortcut)> {
        self.local
            .iter()
            .map(|s| (Pool::Local, s))
            .chain(self.global.iter().map(|s| (Pool::Global, s)))
            .collect()
    }

    /// The pools as persisted: only entries differing from the defaults.
    pub fn user_pools(&self) -> (Vec<Shortcut>, Vec<Shortcut>) {
        let strip = |pool: &[Shortcut], which: Pool| -> Vec<Shortcut> {
            pool.iter()
                .filter(|s| !defaults(which).contains(s))
                .cloned()
                .collect()
        };
        (
            strip(&self.local, Pool::Local),
            strip(&self.global, Pool::Global),
        )
    }

    pub fn subscribe(&mut self, tx: Sender<ShortcutEvent>) {
        self.subscribers.push(tx);
    }

    /// Deliver an event to every live subscriber, dropping dead ones.
    pub fn publish(&mut self, event: ShortcutEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// While suspended (shortcut editor open) no local shortcut fires, so the
    /// editor can capture any combination.
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Match a key press against the local pool. Returns true when a shortcut
    /// fired, in which case the press must not reach the normal key handling.
    pub fn handle_key(&mut self, accel: &str) -> bool {
        if self.suspended {
            return false;
        }
        let hit = self
            .local
            .iter()
            .find(|s| !s.is_invalid() && s.keys.as_deref() == Some(accel))
            .map(|s| ShortcutEvent {
                action: s.action,
                value: s.value.clone(),
            });
        match hit {
            Some(event) => {
                debug!("local shortcut {accel} fired: {}", event.action.label());
                self.publish(event);
                true
            }
            None => false,
        }
    }

    /// Bind an accelerator to an entry, replacing the entry's previous keys.
    /// A conflict with any other binding (in either pool) writes the conflict
    /// sentinel instead; rebinding an entry to the keys it already owns is
    /// not a conflict.
    pub fn try_bind(
        &mut self,
        pool: Pool,
        action: ShortcutAction,
        value: Option<&str>,
        accel: &str,
    ) -> BindOutcome {
        let taken = self
            .local
            .iter()
            .chain(self.global.iter())
            .filter(|s| s.keys.as_deref() == Some(accel))
            .any(|s| s.action != action || s.value.as_deref() != value);

        let keys = if taken { ALREADY_USED } else { accel };
        let entry = Shortcut {
            keys: Some(keys.into()),
            action,
            value: value.map(str::to_owned),
        };
        upsert(self.pool_mut(pool), entry, pool);
        self.dirty = true;

        if taken {
            BindOutcome::AlreadyUsed
        } else {
            BindOutcome::Bound
        }
    }

    /// Ensure a play-track entry exists for a track so the editor can list
    /// it and capture keys for it. Not a change worth persisting by itself:
    /// until keys are bound the entry is invalid and pruned on editor close.
    pub fn add_play_track(&mut self, pool: Pool, value: &str) {
        let entry = Shortcut {
            keys: None,
            action: ShortcutAction::PlayTrack,
            value: Some(value.to_owned()),
        };
        upsert(self.pool_mut(pool), entry, pool);
    }

    /// Drop any play-track binding for a track that no longer exists.
    pub fn remove_play_track(&mut self, value: &str) {
        let gone = |s: &Shortcut| {
            s.action == ShortcutAction::PlayTrack && s.value.as_deref() == Some(value)
        };
        let before = self.local.len() + self.global.len();
        self.local.retain(|s| !gone(s));
        self.global.retain(|s| !gone(s));
        if self.local.len() + self.global.len() != before {
            self.dirty = true;
        }
    }

    /// Drop invalid entries from both pools. Runs when the editor closes so
    /// half-configured bindings do not linger.
    pub fn prune_invalid(&mut self) {
        let before = self.local.len() + self.global.len();
        self.local.retain(|s| !s.is_invalid());
        self.global.retain(|s| !s.is_invalid());
        if self.local.len() + self.global.len() != before {
            self.dirty = true;
        }
    }

    /// True while any global binding is invalid. OS registration stays down
    /// until the editor resolves them.
    pub fn has_invalid_global(&self) -> bool {
        self.global.iter().any(Shortcut::is_invalid)
    }

    /// The accelerator bound to play a given track, if any.
    pub fn key_for_track(&self, path: &Path) -> Option<&str> {
        let wanted = path.to_str()?;
        self.local
            .iter()
            .chain(self.global.iter())
            .find(|s| {
                s.action == ShortcutAction::PlayTrack
                    && s.value.as_deref() == Some(wanted)
                    && !s.is_invalid()
            })
            .and_then(|s| s.keys.as_deref())
    }

    /// True when the pools changed since the flag was last cleared.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn pool_mut(&mut self, pool: Pool) -> &mut Vec<Shortcut> {
        match pool {
            Pool::Local => &mut self.local,
            Pool::Global => &mut self.global,
        }
    }
}

/// Built-in bindings present before any user configuration.
pub fn defaults(pool: Pool) -> Vec<Shortcut> {
    match pool {
        Pool::Global => vec![
            Shortcut::new("MediaPlayPause", ShortcutAction::TogglePause),
            Shortcut::new("MediaNextTrack", ShortcutAction::SkipTrack),
            Shortcut::new("MediaStop", ShortcutAction::StopPlayer),
        ],
        Pool::Local => vec![
            Shortcut::new("Control+M", ShortcutAction::EditShortcuts),
            Shortcut::new("Control+O", ShortcutAction::ImportTracks),
            Shortcut::new("Control+Q", ShortcutAction::Quit),
        ],
    }
}

/// Merge user entries over a base pool. Identity is the action for local
/// bindings and the (action, value) pair for global ones, so a user can bind
/// several tracks globally but each command only once.
fn merge(base: Vec<Shortcut>, user: &[Shortcut], pool: Pool) -> Vec<Shortcut> {
    let mut merged = base;
    for entry in user {
        upsert(&mut merged, entry.clone(), pool);
    }
    merged
}

fn upsert(pool_entries: &mut Vec<Shortcut>, entry: Shortcut, pool: Pool) {
    let same = |s: &Shortcut| match pool {
        Pool::Local => s.action == entry.action,
        Pool::Global => s.action == entry.action && s.value == entry.value,
    };
    match pool_entries.iter_mut().find(|s| same(s)) {
        Some(slot) => *slot = entry,
        None => pool_entries.push(entry),
    }
}
