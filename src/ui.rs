//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::connection::{BotUser, ChannelInfo};
use crate::player::{LoopMode, Player};
use crate::shortcuts::Pool;

/// What the footer area and the key handling are currently doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMode {
    Normal,
    /// Typing a path or directory to import.
    ImportPrompt(String),
    /// Typing a login token.
    TokenPrompt(String),
    /// The shortcut editor overlay.
    Shortcuts { selected: usize, capturing: bool },
}

/// One row of the shortcut editor.
pub struct ShortcutRow {
    pub pool: Pool,
    pub label: String,
    pub track: Option<String>,
    pub keys: Option<String>,
}

/// Read-only snapshot handed to `draw`.
pub struct View<'a> {
    pub header_text: &'a str,
    pub player: &'a Player,
    pub selected: usize,
    pub user: Option<&'a BotUser>,
    pub channel: Option<&'a ChannelInfo>,
    pub invite: Option<&'a str>,
    pub notice: Option<&'a str>,
    pub mode: &'a UiMode,
    pub shortcut_rows: &'a [ShortcutRow],
}

const CONTROLS: &str = "[j/k] up/down | [J/K] move | [enter] play | [a] queue | [u] unqueue | \
     [d] remove | [space] pause | [s] skip | [x] stop | [r] loop | [c] channel | [t] token | \
     [i] import | [Ctrl+M] shortcuts | [q] quit";

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn loop_text(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::Off => "LOOP: Off",
        LoopMode::Queue => "LOOP: Queue",
        LoopMode::Song => "LOOP: Song",
    }
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(view.header_text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" botboard ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = {
        let mut parts: Vec<String> = Vec::new();

        match view.user {
            Some(user) => parts.push(format!("USER: {}", user.name)),
            None => parts.push("USER: logged out".to_string()),
        }

        match view.channel {
            Some(channel) => parts.push(format!("CHANNEL: {}", channel.name)),
            None => parts.push("CHANNEL: -".to_string()),
        }

        parts.push(loop_text(view.player.loop_mode).to_string());

        match view.player.playing.as_ref() {
            Some(entry) => {
                let state = if view.player.paused { "Paused" } else { "Playing" };
                parts.push(format!("Sound: {} [{}]", entry.source.name, state));
            }
            None => parts.push("Stopped".to_string()),
        }

        if !view.player.queue.is_empty() {
            parts.push(format!("Queued: {}", view.player.queue.len()));
        }

        if let Some(invite) = view.invite {
            parts.push(format!("Invite: {invite}"));
        }

        if let Some(notice) = view.notice {
            parts.push(format!("! {notice}"));
        }

        parts.join(" • ")
    };

    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Body: track list on the left, queue on the right.
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[2]);

    {
        let items: Vec<ListItem> = view
            .player
            .tracks
            .iter()
            .map(|track| match track.key.as_deref() {
                Some(key) => ListItem::new(format!("{} [{}]", track.name, key)),
                None => ListItem::new(track.name.as_str()),
            })
            .collect();
        let total = items.len();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(view.selected.min(total - 1)));
        }
        frame.render_stateful_widget(list, body[0], &mut state);
    }

    {
        let items: Vec<ListItem> = view
            .player
            .queue
            .iter()
            .enumerate()
            .map(|(i, track)| ListItem::new(format!("{} {}", i + 1, track.name)))
            .collect();
        let queue = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" queue "));
        frame.render_widget(queue, body[1]);
    }

    // Shortcut editor overlay (keeps the lists visible under it).
    if let UiMode::Shortcuts { selected, capturing } = view.mode {
        let popup_area = centered_rect_sized(72, 14, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = view
            .shortcut_rows
            .iter()
            .map(|row| {
                let scope = match row.pool {
                    Pool::Local => "local ",
                    Pool::Global => "global",
                };
                let what = match row.track.as_deref() {
                    Some(track) => format!("{}: {}", row.label, track),
                    None => row.label.clone(),
                };
                let keys = row.keys.as_deref().unwrap_or("unbound");
                ListItem::new(format!("[{scope}] {what}  ->  {keys}"))
            })
            .collect();

        let title = if *capturing {
            " shortcuts (press keys, Esc cancels) "
        } else {
            " shortcuts (enter rebinds, a adds track, Esc closes) "
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if !view.shortcut_rows.is_empty() {
            state.select(Some((*selected).min(view.shortcut_rows.len() - 1)));
        }
        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    // Footer: controls, or the active prompt.
    let footer_text = match view.mode {
        UiMode::ImportPrompt(input) => format!("Import path: {input}_  (enter imports, Esc cancels)"),
        UiMode::TokenPrompt(input) => {
            format!("Token: {}_  (enter logs in, Esc cancels)", "*".repeat(input.len()))
        }
        _ => CONTROLS.to_string(),
    };
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[3]);
}
