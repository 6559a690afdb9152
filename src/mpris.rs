//! MPRIS service so desktop media controls (playerctl, media applets) reach
//! the player alongside the configurable global shortcuts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc::Sender};

use async_io::{Timer, block_on};
use zbus::{Connection, interface};
use zvariant::{OwnedValue, Value};

/// Commands arriving from the desktop, folded into the dispatch loop next to
/// shortcut events.
#[derive(Clone, Debug)]
pub enum ControlCmd {
    Quit,
    PlayPause,
    Next,
    Stop,
}

#[derive(Debug, Default)]
struct SharedState {
    title: Option<String>,
    playing: bool,
    paused: bool,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
}

impl MprisHandle {
    /// Mirror the player's surface into the D-Bus properties.
    pub fn set_now_playing(&self, title: Option<String>, playing: bool, paused: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.title = title;
            s.playing = playing;
            s.paused = paused;
        }
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "botboard"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        // A soundboard queue has no backwards direction.
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        if !s.playing {
            "Stopped"
        } else if s.paused {
            "Paused"
        } else {
            "Playing"
        }
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        // Minimal metadata so `playerctl metadata` shows something.
        let mut map = HashMap::new();
        let title = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| "".to_string());

        let title_value = OwnedValue::try_from(Value::from(title)).unwrap_or_else(|_| {
            OwnedValue::try_from(Value::from(String::new())).expect("OwnedValue conversion")
        });

        map.insert("xesam:title".to_string(), title_value);
        map
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let path = "/org/mpris/MediaPlayer2";

            let connection = match Connection::session().await {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("MPRIS: failed to connect to session bus: {e}");
                    return;
                }
            };

            if let Err(e) = connection
                .request_name("org.mpris.MediaPlayer2.botboard")
                .await
            {
                eprintln!("MPRIS: failed to acquire name: {e}");
                return;
            }

            let object_server = connection.object_server();

            if let Err(e) = object_server.at(path, RootIface { tx: tx.clone() }).await {
                eprintln!("MPRIS: failed to register root iface: {e}");
                return;
            }

            if let Err(e) = object_server
                .at(
                    path,
                    PlayerIface {
                        tx,
                        state: state_for_thread,
                    },
                )
                .await
            {
                eprintln!("MPRIS: failed to register player iface: {e}");
                return;
            }

            // Keep the service alive.
            loop {
                Timer::after(std::time::Duration::from_secs(3600)).await;
            }
        });
    });

    MprisHandle { state }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn iface_pair() -> (MprisHandle, PlayerIface, mpsc::Receiver<ControlCmd>) {
        let state = Arc::new(Mutex::new(SharedState::default()));
        let (tx, rx) = mpsc::channel();
        let iface = PlayerIface {
            tx,
            state: state.clone(),
        };
        (MprisHandle { state }, iface, rx)
    }

    #[test]
    fn playback_status_reflects_now_playing_updates() {
        let (handle, iface, _rx) = iface_pair();
        assert_eq!(iface.playback_status(), "Stopped");

        handle.set_now_playing(Some("horn".into()), true, false);
        assert_eq!(iface.playback_status(), "Playing");

        handle.set_now_playing(Some("horn".into()), true, true);
        assert_eq!(iface.playback_status(), "Paused");

        handle.set_now_playing(None, false, false);
        assert_eq!(iface.playback_status(), "Stopped");
    }

    #[test]
    fn metadata_carries_the_current_title() {
        let (handle, iface, _rx) = iface_pair();
        handle.set_now_playing(Some("airhorn".into()), true, false);

        let map = iface.metadata();
        let title = map.get("xesam:title").unwrap();
        assert_eq!(String::try_from(title.clone()).unwrap(), "airhorn");
    }

    #[test]
    fn player_methods_send_control_commands() {
        let (_handle, iface, rx) = iface_pair();
        iface.play_pause();
        iface.next();
        iface.stop();

        assert!(matches!(rx.try_recv().unwrap(), ControlCmd::PlayPause));
        assert!(matches!(rx.try_recv().unwrap(), ControlCmd::Next));
        assert!(matches!(rx.try_recv().unwrap(), ControlCmd::Stop));
        assert!(rx.try_recv().is_err());
    }
}
