//! Keyboard shortcuts: accelerator encoding, the two-pool registry and the
//! OS-level hotkey bridge.
//!
//! Local shortcuts fire only while the application has keyboard focus and are
//! matched against encoded key presses; global shortcuts are registered with
//! the OS through `global-hotkey` and fire anywhere. Both pools merge user
//! bindings over built-in defaults.

mod encode;
mod global;
mod registry;

pub use encode::{KeyPress, encode, keypress_from_event};
pub use global::GlobalShortcuts;
pub use registry::{
    ALREADY_USED, BindOutcome, Pool, Shortcut, ShortcutAction, ShortcutEvent, ShortcutRegistry,
};

#[cfg(test)]
mod tests;
