use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use log::warn;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::config::{AppState, Settings};
use crate::connection::{ConnectionManager, ConnectionNotice};
use crate::library;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::player::{Player, PlayerAction};
use crate::shortcuts::{
    BindOutcome, GlobalShortcuts, Pool, ShortcutAction, ShortcutEvent, ShortcutRegistry, encode,
    keypress_from_event,
};
use crate::ui::{self, ShortcutRow, UiMode, View};
use crate::voice::PlayerEvent;

const NOTICE_TTL: Duration = Duration::from_secs(5);
const DRIVE_RETRY: Duration = Duration::from_secs(1);

/// State tracked by the runtime event loop across iterations.
struct EventLoopState {
    mode: UiMode,
    selected: usize,
    notice: Option<(String, Instant)>,
    quit: bool,
    /// Whether the OS currently holds our global hotkey registrations.
    globals_active: bool,
    /// The registered set no longer matches the registry.
    globals_stale: bool,
    /// Set after a failed driving step; retried after a cooldown so a broken
    /// file does not spin the loop.
    last_drive_error: Option<Instant>,
    last_mpris: (Option<String>, bool, bool),
}

impl EventLoopState {
    fn new() -> Self {
        Self {
            mode: UiMode::Normal,
            selected: 0,
            notice: None,
            quit: false,
            globals_active: false,
            globals_stale: true,
            last_drive_error: None,
            last_mpris: (None, false, false),
        }
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
    }
}

/// Main terminal event loop: input, drawing, event dispatch, the playback
/// driving step and persistence. Returns `Ok(())` on a requested shutdown and
/// `Err` when the session dies underneath us.
#[allow(clippy::too_many_arguments)]
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &Settings,
    player: &mut Player,
    registry: &mut ShortcutRegistry,
    conn: &mut ConnectionManager,
    globals: &mut Option<GlobalShortcuts>,
    mpris: &MprisHandle,
    player_rx: &mpsc::Receiver<PlayerEvent>,
    shortcut_rx: &mpsc::Receiver<ShortcutEvent>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    app_state: &mut AppState,
    state_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = EventLoopState::new();

    loop {
        // Backend events first: they decide whether a channel is still open.
        for notice in conn.process_events() {
            match notice {
                ConnectionNotice::Ready => state.set_notice("connected"),
                ConnectionNotice::ChannelLost(id) => {
                    state.set_notice(format!("voice channel {id} went away"));
                }
                ConnectionNotice::Fatal(reason) => {
                    save_state(player, registry, app_state, state_path);
                    return Err(format!("session invalidated: {reason}").into());
                }
            }
        }
        player.set_channel_open(conn.channel().is_some());

        for ev in player_rx.try_iter() {
            match ev {
                PlayerEvent::StreamFinished(id) => {
                    player.apply(PlayerAction::StreamFinished(id));
                }
            }
        }

        let fired: Vec<ShortcutEvent> = shortcut_rx.try_iter().collect();
        for ev in fired {
            apply_shortcut(&mut state, player, registry, ev);
        }

        for cmd in control_rx.try_iter() {
            match cmd {
                ControlCmd::PlayPause => player.apply(PlayerAction::TogglePause),
                ControlCmd::Next => player.apply(PlayerAction::Skip),
                ControlCmd::Stop => player.apply(PlayerAction::Stop),
                ControlCmd::Quit => state.quit = true,
            }
        }

        // Persist shortcut and track changes as they happen, not just on exit.
        if registry.dirty() {
            save_state(player, registry, app_state, state_path);
            registry.clear_dirty();
            player.clear_tracks_dirty();
            state.globals_stale = true;
        }
        if player.tracks_dirty() {
            save_state(player, registry, app_state, state_path);
            player.clear_tracks_dirty();
        }

        // Mirror the registry into the OS. Registrations are dropped entirely
        // while the editor is open (captures must not trigger live bindings)
        // and while any global entry is invalid.
        if let Some(globals) = globals.as_mut() {
            let editor_open = matches!(state.mode, UiMode::Shortcuts { .. });
            let want_active = !editor_open && !registry.has_invalid_global();
            if want_active != state.globals_active || (want_active && state.globals_stale) {
                if want_active {
                    globals.sync(registry.global_merged());
                } else {
                    globals.clear();
                }
                state.globals_active = want_active;
                state.globals_stale = false;
            }
            for ev in globals.poll() {
                registry.publish(ev);
            }
        }

        // The driving step. A failure (unreadable file, dead backend) keeps
        // the queue head for a retry after a cooldown.
        let may_drive = state
            .last_drive_error
            .is_none_or(|at| at.elapsed() >= DRIVE_RETRY);
        if may_drive {
            match player.drive(conn.voice()) {
                Ok(_) => state.last_drive_error = None,
                Err(err) => {
                    warn!("driving step failed: {err}");
                    state.set_notice(format!("playback failed: {err}"));
                    state.last_drive_error = Some(Instant::now());
                }
            }
        }

        let mpris_now = (
            player.playing.as_ref().map(|e| e.source.name.clone()),
            player.playing.is_some(),
            player.paused,
        );
        if mpris_now != state.last_mpris {
            mpris.set_now_playing(mpris_now.0.clone(), mpris_now.1, mpris_now.2);
            state.last_mpris = mpris_now;
        }

        if state
            .notice
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() > NOTICE_TTL)
        {
            state.notice = None;
        }
        if !player.tracks.is_empty() {
            state.selected = state.selected.min(player.tracks.len() - 1);
        } else {
            state.selected = 0;
        }

        let shortcut_rows: Vec<ShortcutRow> = registry
            .all_merged()
            .iter()
            .map(|(pool, s)| ShortcutRow {
                pool: *pool,
                label: s.action.label().to_string(),
                track: s.value.as_ref().map(|v| {
                    player
                        .track_by_path(Path::new(v))
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| v.clone())
                }),
                keys: s.keys.clone(),
            })
            .collect();

        let invite = conn.invite_link();
        let view = View {
            header_text: &settings.ui.header_text,
            player,
            selected: state.selected,
            user: conn.user(),
            channel: conn.channel(),
            invite: invite.as_deref(),
            notice: state.notice.as_ref().map(|(text, _)| text.as_str()),
            mode: &state.mode,
            shortcut_rows: &shortcut_rows,
        };
        terminal.draw(|frame| ui::draw(frame, &view))?;

        if event::poll(Duration::from_millis(settings.ui.tick_ms))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(
                        &mut state, settings, player, registry, conn, app_state, state_path, key,
                    );
                }
            }
        }

        if state.quit {
            conn.leave_channel();
            save_state(player, registry, app_state, state_path);
            return Ok(());
        }
    }
}

/// React to a fired shortcut, regardless of which pool delivered it.
fn apply_shortcut(
    state: &mut EventLoopState,
    player: &mut Player,
    registry: &mut ShortcutRegistry,
    ev: ShortcutEvent,
) {
    match ev.action {
        ShortcutAction::TogglePause => player.apply(PlayerAction::TogglePause),
        ShortcutAction::SkipTrack => player.apply(PlayerAction::Skip),
        ShortcutAction::StopPlayer => player.apply(PlayerAction::Stop),
        ShortcutAction::PlayTrack => {
            if let Some(value) = ev.value {
                player.apply(PlayerAction::PlayTrack(PathBuf::from(value)));
            }
        }
        ShortcutAction::ImportTracks => state.mode = UiMode::ImportPrompt(String::new()),
        ShortcutAction::EditShortcuts => match state.mode {
            UiMode::Shortcuts { .. } => close_editor(state, registry),
            _ => open_editor(state, registry),
        },
        ShortcutAction::Quit => state.quit = true,
    }
}

fn open_editor(state: &mut EventLoopState, registry: &mut ShortcutRegistry) {
    registry.set_suspended(true);
    state.mode = UiMode::Shortcuts {
        selected: 0,
        capturing: false,
    };
}

fn close_editor(state: &mut EventLoopState, registry: &mut ShortcutRegistry) {
    registry.prune_invalid();
    registry.set_suspended(false);
    state.mode = UiMode::Normal;
    state.globals_stale = true;
}

#[allow(clippy::too_many_arguments)]
fn handle_key(
    state: &mut EventLoopState,
    settings: &Settings,
    player: &mut Player,
    registry: &mut ShortcutRegistry,
    conn: &mut ConnectionManager,
    app_state: &mut AppState,
    state_path: &Path,
    key: KeyEvent,
) {
    match state.mode.clone() {
        UiMode::Shortcuts { selected, capturing } => {
            handle_editor_key(state, player, registry, selected, capturing, key);
        }
        UiMode::ImportPrompt(input) => match key.code {
            KeyCode::Esc => state.mode = UiMode::Normal,
            KeyCode::Enter => {
                let path = input.trim();
                if !path.is_empty() {
                    let tracks = library::import(&[PathBuf::from(path)]);
                    state.set_notice(format!("imported {} track(s)", tracks.len()));
                    player.apply(PlayerAction::AddTracks(tracks));
                }
                state.mode = UiMode::Normal;
            }
            KeyCode::Backspace => {
                let mut input = input;
                input.pop();
                state.mode = UiMode::ImportPrompt(input);
            }
            KeyCode::Char(c) => {
                let mut input = input;
                input.push(c);
                state.mode = UiMode::ImportPrompt(input);
            }
            _ => {}
        },
        UiMode::TokenPrompt(input) => match key.code {
            KeyCode::Esc => state.mode = UiMode::Normal,
            KeyCode::Enter => {
                let token = input.trim().to_string();
                match conn.login(&token) {
                    Ok(user) => {
                        app_state.token = Some(token);
                        if let Err(err) = app_state.save(state_path) {
                            warn!("could not persist state: {err}");
                        }
                        state.set_notice(format!("logged in as {}", user.name));
                    }
                    Err(err) => state.set_notice(format!("login failed: {err}")),
                }
                state.mode = UiMode::Normal;
            }
            KeyCode::Backspace => {
                let mut input = input;
                input.pop();
                state.mode = UiMode::TokenPrompt(input);
            }
            KeyCode::Char(c) => {
                let mut input = input;
                input.push(c);
                state.mode = UiMode::TokenPrompt(input);
            }
            _ => {}
        },
        UiMode::Normal => handle_normal_key(state, settings, player, registry, conn, key),
    }
}

fn handle_editor_key(
    state: &mut EventLoopState,
    player: &Player,
    registry: &mut ShortcutRegistry,
    selected: usize,
    capturing: bool,
    key: KeyEvent,
) {
    let rows = registry.all_merged().len();

    if capturing {
        if key.code == KeyCode::Esc {
            state.mode = UiMode::Shortcuts {
                selected,
                capturing: false,
            };
            return;
        }
        let Some(press) = keypress_from_event(&key) else {
            return;
        };
        // Modifier-only presses keep the capture open until a main key lands.
        let Some(accel) = encode(&press) else {
            return;
        };
        let target = registry
            .all_merged()
            .get(selected)
            .map(|(pool, s)| (*pool, s.action, s.value.clone()));
        if let Some((pool, action, value)) = target {
            match registry.try_bind(pool, action, value.as_deref(), &accel) {
                BindOutcome::Bound => state.set_notice(format!("bound {accel}")),
                BindOutcome::AlreadyUsed => {
                    state.set_notice(format!("{accel} is already used"));
                }
            }
        }
        state.mode = UiMode::Shortcuts {
            selected,
            capturing: false,
        };
        return;
    }

    match key.code {
        KeyCode::Esc => close_editor(state, registry),
        KeyCode::Up | KeyCode::Char('k') => {
            state.mode = UiMode::Shortcuts {
                selected: selected.saturating_sub(1),
                capturing: false,
            };
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let last = rows.saturating_sub(1);
            state.mode = UiMode::Shortcuts {
                selected: (selected + 1).min(last),
                capturing: false,
            };
        }
        KeyCode::Enter => {
            if rows > 0 {
                state.mode = UiMode::Shortcuts {
                    selected,
                    capturing: true,
                };
            }
        }
        KeyCode::Char('a') => {
            // Add an entry for the first track that has none yet; it shows up
            // unbound and is captured like any other row.
            let with_entry: HashSet<&str> = registry
                .all_merged()
                .iter()
                .filter(|(_, s)| s.action == ShortcutAction::PlayTrack)
                .filter_map(|(_, s)| s.value.as_deref())
                .collect();
            let candidate = player
                .tracks
                .iter()
                .filter_map(|t| t.path.to_str())
                .find(|p| !with_entry.contains(p))
                .map(str::to_owned);
            match candidate {
                Some(path) => {
                    registry.add_play_track(Pool::Global, &path);
                    state.mode = UiMode::Shortcuts {
                        selected: registry.all_merged().len().saturating_sub(1),
                        capturing: false,
                    };
                }
                None => state.set_notice("every track already has an entry"),
            }
        }
        _ => {
            // Ctrl+M still toggles the editor shut even though local
            // shortcuts are suspended while it is open.
            if let Some(press) = keypress_from_event(&key) {
                if encode(&press).as_deref() == Some("Control+M") {
                    close_editor(state, registry);
                }
            }
        }
    }
}

fn handle_normal_key(
    state: &mut EventLoopState,
    settings: &Settings,
    player: &mut Player,
    registry: &mut ShortcutRegistry,
    conn: &mut ConnectionManager,
    key: KeyEvent,
) {
    // Configured shortcuts win over the built-in keys below; a press that
    // fires one is swallowed.
    if let Some(press) = keypress_from_event(&key) {
        if let Some(accel) = encode(&press) {
            if registry.handle_key(&accel) {
                return;
            }
        }
    }

    let selected_path = player.tracks.get(state.selected).map(|t| t.path.clone());

    match key.code {
        KeyCode::Char('q') => state.quit = true,
        KeyCode::Down | KeyCode::Char('j') => {
            if !player.tracks.is_empty() {
                state.selected = (state.selected + 1).min(player.tracks.len() - 1);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => state.selected = state.selected.saturating_sub(1),
        KeyCode::Char('J') => {
            if state.selected + 1 < player.tracks.len() {
                player.apply(PlayerAction::ReorderTracks {
                    from: state.selected,
                    to: state.selected + 1,
                });
                state.selected += 1;
            }
        }
        KeyCode::Char('K') => {
            if state.selected > 0 {
                player.apply(PlayerAction::ReorderTracks {
                    from: state.selected,
                    to: state.selected - 1,
                });
                state.selected -= 1;
            }
        }
        KeyCode::Enter => match selected_path {
            Some(path) if player.channel_open() => player.apply(PlayerAction::PlayTrack(path)),
            Some(_) => state.set_notice("join a channel first ([c])"),
            None => {}
        },
        KeyCode::Char('a') => match selected_path {
            Some(path) if player.channel_open() => player.apply(PlayerAction::QueueTrack(path)),
            Some(_) => state.set_notice("join a channel first ([c])"),
            None => {}
        },
        KeyCode::Char('d') => {
            if let Some(path) = selected_path {
                // With pruning on, a removed track also loses its queue
                // entries and any play-track binding.
                if settings.player.prune_queue_on_remove {
                    if let Some(p) = path.to_str() {
                        registry.remove_play_track(p);
                    }
                }
                player.apply(PlayerAction::RemoveTrack(path));
            }
        }
        KeyCode::Char('u') => player.apply(PlayerAction::UnqueueTrack(0)),
        KeyCode::Char(' ') => player.apply(PlayerAction::TogglePause),
        KeyCode::Char('s') => player.apply(PlayerAction::Skip),
        KeyCode::Char('x') => player.apply(PlayerAction::Stop),
        KeyCode::Char('r') => player.apply(PlayerAction::ToggleLoop),
        KeyCode::Char('c') => toggle_channel(state, conn),
        KeyCode::Char('t') => {
            // Toggles the session: prompt for a token when logged out, log
            // out otherwise (the saved token is kept for the next login).
            if conn.user().is_some() {
                conn.logout();
                state.set_notice("logged out");
            } else {
                state.mode = UiMode::TokenPrompt(String::new());
            }
        }
        KeyCode::Char('i') => state.mode = UiMode::ImportPrompt(String::new()),
        _ => {}
    }
}

/// Join the first joinable channel, or leave the one we are in.
fn toggle_channel(state: &mut EventLoopState, conn: &mut ConnectionManager) {
    if conn.channel().is_some() {
        conn.leave_channel();
        return;
    }
    if conn.user().is_none() {
        state.set_notice("log in first ([t])");
        return;
    }
    if conn.selected_guild().is_none() {
        if let Some(guild) = conn.guilds().first() {
            conn.select_guild(&guild.id);
        }
    }
    let Some(channel) = conn.channels().into_iter().find(|c| c.joinable) else {
        state.set_notice("no joinable voice channel");
        return;
    };
    match conn.join_channel(&channel) {
        Ok(()) => state.set_notice(format!("joined {}", channel.name)),
        Err(err) => state.set_notice(format!("join failed: {err}")),
    }
}

/// Fold the live track list and shortcut pools back into the persisted
/// document and write it out. Track entries carry the accelerator currently
/// bound to them so the list renders consistently after a restart.
fn save_state(
    player: &mut Player,
    registry: &ShortcutRegistry,
    app_state: &mut AppState,
    state_path: &Path,
) {
    for track in &mut player.tracks {
        track.key = registry.key_for_track(&track.path).map(str::to_owned);
    }
    let (local, global) = registry.user_pools();
    app_state.local_shortcuts = local;
    app_state.global_shortcuts = global;
    app_state.tracks = player.tracks.clone();
    if let Err(err) = app_state.save(state_path) {
        warn!("could not persist state: {err}");
    }
}
