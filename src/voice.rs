//! Voice transport contract.
//!
//! The player never talks to a chat platform directly: it drives whatever
//! implements [`VoiceConnection`] and owns at most one [`OutgoingStream`] at a
//! time. Stream completion is delivered asynchronously as a [`PlayerEvent`]
//! carrying the stream's generation token, so a late notification from a
//! superseded stream can be recognized and dropped.

use std::path::{Path, PathBuf};

use thiserror::Error;

mod local;

pub use local::LocalVoice;

/// Generation token attached to every acquired stream. The player hands out a
/// fresh one per `play` call and ignores finish notifications whose token does
/// not match the stream it currently owns.
pub type StreamId = u64;

/// Asynchronous notifications re-entering the single-threaded dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The stream with this token played to the end on its own.
    StreamFinished(StreamId),
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}")]
    Decode { path: PathBuf },
    #[error("voice backend unavailable: {0}")]
    Unavailable(String),
}

/// A live audio stream into a voice channel.
///
/// The handle is owned exclusively by the player. `destroy` must be called on
/// every transition that ends playback early (play-track, skip, stop, channel
/// loss); a stream that finished on its own is simply dropped.
pub trait OutgoingStream {
    fn pause(&mut self);
    fn resume(&mut self);
    fn destroy(&mut self);
}

/// An open voice connection able to stream audio files.
pub trait VoiceConnection {
    fn play(&mut self, path: &Path, id: StreamId)
    -> Result<Box<dyn OutgoingStream>, VoiceError>;
}
