//! Persisted application state.
//!
//! Unlike the read-only settings, this document is rewritten by the
//! application whenever tracks or shortcuts change. It lives next to the
//! config file as `state.json`; field names stay camelCase so documents
//! written by earlier builds keep loading.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::Track;
use crate::shortcuts::Shortcut;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("could not write state to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    pub tracks: Vec<Track>,
    pub local_shortcuts: Vec<Shortcut>,
    pub global_shortcuts: Vec<Shortcut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AppState {
    /// Load the state document, falling back to defaults when the file is
    /// missing or unreadable. A corrupt document is not fatal; it is reported
    /// and replaced on the next save.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!("could not read {}: {err}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!("ignoring corrupt state document {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Write the document atomically: serialize to a sibling temp file, then
    /// rename over the target.
    pub fn save(&self, path: &Path) -> Result<(), StateStoreError> {
        let json = serde_json::to_string_pretty(self)?;

        let write = |p: &Path| -> io::Result<()> {
            if let Some(dir) = p.parent() {
                fs::create_dir_all(dir)?;
            }
            let tmp = p.with_extension("json.tmp");
            fs::write(&tmp, &json)?;
            fs::rename(&tmp, p)
        };

        write(path).map_err(|source| StateStoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolve the state path from `BOTBOARD_STATE_PATH` or XDG defaults.
pub fn resolve_state_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("BOTBOARD_STATE_PATH") {
        return Some(PathBuf::from(p));
    }
    default_state_path()
}

/// Compute the default state path under `$XDG_CONFIG_HOME/botboard/state.json`
/// or `~/.config/botboard/state.json` when `XDG_CONFIG_HOME` is not set.
pub fn default_state_path() -> Option<PathBuf> {
    super::settings::config_home().map(|d| d.join("botboard").join("state.json"))
}
