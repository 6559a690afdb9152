//! Settings (read-only, file + environment) and the persisted application
//! state (tracks, shortcut pools, token).

mod settings;
mod store;

pub use settings::Settings;
pub use store::{AppState, resolve_state_path};

#[cfg(test)]
mod tests;
