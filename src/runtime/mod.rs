use std::env;
use std::path::PathBuf;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::warn;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::config::{AppState, Settings, resolve_state_path};
use crate::connection::{ConnectionManager, LocalSession};
use crate::library;
use crate::mpris::ControlCmd;
use crate::player::{Player, PlayerAction};
use crate::shortcuts::{GlobalShortcuts, ShortcutEvent, ShortcutRegistry};
use crate::voice::PlayerEvent;

mod event_loop;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    settings.validate()?;

    let state_path = resolve_state_path().ok_or("cannot resolve a state path (no HOME set)")?;
    let mut app_state = AppState::load(&state_path);

    let (player_tx, player_rx) = mpsc::channel::<PlayerEvent>();
    let (shortcut_tx, shortcut_rx) = mpsc::channel::<ShortcutEvent>();
    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();

    let mut player = Player::new(
        app_state.tracks.clone(),
        settings.player.prune_queue_on_remove,
    );

    // Paths given on the command line are imported like a drop onto the list.
    let args: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if !args.is_empty() {
        player.apply(PlayerAction::AddTracks(library::import(&args)));
    }

    let mut registry =
        ShortcutRegistry::from_state(&app_state.local_shortcuts, &app_state.global_shortcuts);
    registry.subscribe(shortcut_tx);

    let client = LocalSession::new(player_tx, settings.audio.finish_poll_ms);
    let mut conn = ConnectionManager::new(Box::new(client));
    if let Some(token) = app_state.token.clone() {
        if let Err(err) = conn.login(&token) {
            warn!("saved token no longer logs in: {err}");
        }
    }

    // OS-level hotkeys are best-effort: on a headless or unsupported session
    // the rest of the application still works.
    let mut globals = match GlobalShortcuts::new() {
        Ok(g) => Some(g),
        Err(err) => {
            warn!("global shortcuts unavailable: {err}");
            None
        }
    };

    let mpris = crate::mpris::spawn_mpris(control_tx);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = event_loop::run(
        &mut terminal,
        &settings,
        &mut player,
        &mut registry,
        &mut conn,
        &mut globals,
        &mpris,
        &player_rx,
        &shortcut_rx,
        &control_rx,
        &mut app_state,
        &state_path,
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
