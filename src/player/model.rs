//! Player state and the action dispatch path.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::library::Track;
use crate::voice::{OutgoingStream, StreamId};

/// Loop behavior applied when a stream finishes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    /// The finished track goes back to the end of the queue.
    Queue,
    /// The finished track is replayed immediately.
    Song,
}

impl LoopMode {
    /// Advance cyclically: off -> loop-queue -> loop-song -> off.
    pub fn next(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Queue,
            LoopMode::Queue => LoopMode::Song,
            LoopMode::Song => LoopMode::Off,
        }
    }
}

/// Exclusive ownership of the one live stream, tagged with its generation
/// token so stale finish notifications can be told apart.
pub struct PlayingEntry {
    pub stream: Box<dyn OutgoingStream>,
    pub source: Track,
    pub id: StreamId,
}

/// Everything that can happen to the player, as one tagged union processed by
/// a single dispatch path.
pub enum PlayerAction {
    AddTracks(Vec<Track>),
    RemoveTrack(PathBuf),
    ReorderTracks { from: usize, to: usize },
    ToggleLoop,
    QueueTrack(PathBuf),
    UnqueueTrack(usize),
    TogglePause,
    PlayTrack(PathBuf),
    Skip,
    Stop,
    StreamStarted {
        id: StreamId,
        stream: Box<dyn OutgoingStream>,
    },
    StreamFinished(StreamId),
}

pub struct Player {
    pub tracks: Vec<Track>,
    pub queue: Vec<Track>,
    pub playing: Option<PlayingEntry>,
    pub last_played: Option<Track>,
    pub paused: bool,
    pub loop_mode: LoopMode,

    pub(crate) channel_open: bool,
    pub(crate) next_stream_id: StreamId,

    prune_queue_on_remove: bool,
    tracks_dirty: bool,
}

impl Player {
    pub fn new(tracks: Vec<Track>, prune_queue_on_remove: bool) -> Self {
        Self {
            tracks,
            queue: Vec::new(),
            playing: None,
            last_played: None,
            paused: false,
            loop_mode: LoopMode::Off,
            channel_open: false,
            next_stream_id: 0,
            prune_queue_on_remove,
            tracks_dirty: false,
        }
    }

    /// Gate input from the connection manager: queueing and immediate play
    /// require an open voice channel, and losing the channel cancels playback
    /// on the next driving step.
    pub fn set_channel_open(&mut self, open: bool) {
        self.channel_open = open;
    }

    pub fn channel_open(&self) -> bool {
        self.channel_open
    }

    /// True when the track list changed since the flag was last cleared
    /// (signals the runtime to persist).
    pub fn tracks_dirty(&self) -> bool {
        self.tracks_dirty
    }

    pub fn clear_tracks_dirty(&mut self) {
        self.tracks_dirty = false;
    }

    pub fn track_by_path(&self, path: &Path) -> Option<&Track> {
        self.tracks.iter().find(|t| t.path == path)
    }

    /// Apply one state transition. Side effects on the owned stream (pause,
    /// resume, destroy) happen here as well; acquiring a stream is the
    /// driving step's job.
    pub fn apply(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::AddTracks(batch) => {
                for track in batch {
                    if self.tracks.iter().any(|t| t.path == track.path) {
                        continue;
                    }
                    self.tracks.push(track);
                    self.tracks_dirty = true;
                }
            }

            PlayerAction::RemoveTrack(path) => {
                let before = self.tracks.len();
                self.tracks.retain(|t| t.path != path);
                if self.tracks.len() != before {
                    self.tracks_dirty = true;
                }
                if self.prune_queue_on_remove {
                    self.queue.retain(|t| t.path != path);
                }
            }

            PlayerAction::ReorderTracks { from, to } => {
                if from < self.tracks.len() && to < self.tracks.len() && from != to {
                    let track = self.tracks.remove(from);
                    self.tracks.insert(to, track);
                    self.tracks_dirty = true;
                }
            }

            PlayerAction::ToggleLoop => {
                self.loop_mode = self.loop_mode.next();
            }

            PlayerAction::QueueTrack(path) => {
                if !self.channel_open {
                    warn!("ignoring queue-track without a joined voice channel");
                    return;
                }
                match self.track_by_path(&path) {
                    Some(track) => self.queue.push(track.clone()),
                    None => warn!("queue-track for unknown path {}", path.display()),
                }
            }

            PlayerAction::UnqueueTrack(index) => {
                if index < self.queue.len() {
                    self.queue.remove(index);
                }
            }

            PlayerAction::TogglePause => {
                self.paused = !self.paused;
                if let Some(entry) = self.playing.as_mut() {
                    if self.paused {
                        entry.stream.pause();
                    } else {
                        entry.stream.resume();
                    }
                }
            }

            PlayerAction::PlayTrack(path) => {
                if !self.channel_open {
                    warn!("ignoring play-track without a joined voice channel");
                    return;
                }
                let Some(track) = self.track_by_path(&path).cloned() else {
                    warn!("play-track for unknown path {}", path.display());
                    return;
                };
                // Immediate play bypasses whatever was queued.
                self.destroy_current();
                self.last_played = None;
                self.queue = vec![track];
            }

            PlayerAction::Skip => {
                self.destroy_current();
                let skipped = self.last_played.take();
                if self.loop_mode != LoopMode::Off {
                    // Cycle to the next song instead of dropping the skipped
                    // one out of the rotation.
                    if let Some(track) = skipped {
                        self.queue.push(track);
                    }
                }
                self.paused = false;
            }

            PlayerAction::Stop => {
                self.destroy_current();
                self.last_played = None;
                self.queue.clear();
            }

            PlayerAction::StreamStarted { id, mut stream } => {
                if self.playing.is_some() || self.queue.is_empty() {
                    warn!("stray stream {id} started with nothing to play, releasing it");
                    stream.destroy();
                    return;
                }
                if self.paused {
                    stream.pause();
                }
                let source = self.queue.remove(0);
                self.last_played = Some(source.clone());
                self.playing = Some(PlayingEntry { stream, source, id });
            }

            PlayerAction::StreamFinished(id) => {
                match self.playing.take() {
                    Some(entry) if entry.id == id => {
                        // Finished on its own; the handle is dropped, not
                        // destroyed. Re-queue per loop mode.
                        match self.loop_mode {
                            LoopMode::Off => {
                                if self.queue.is_empty() {
                                    self.last_played = None;
                                }
                            }
                            LoopMode::Queue => self.queue.push(entry.source),
                            LoopMode::Song => self.queue.insert(0, entry.source),
                        }
                    }
                    Some(entry) => {
                        debug!(
                            "ignoring finish of superseded stream {id} (current is {})",
                            entry.id
                        );
                        self.playing = Some(entry);
                    }
                    None => debug!("ignoring finish of stream {id}, nothing is playing"),
                }
            }
        }
    }

    /// Release the owned stream, if any. Exactly one destroy per stream: the
    /// entry is taken out of `playing` first.
    fn destroy_current(&mut self) {
        if let Some(mut entry) = self.playing.take() {
            entry.stream.destroy();
        }
    }
}
