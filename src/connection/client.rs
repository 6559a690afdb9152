//! The chat backend contract.

use std::fmt;

use thiserror::Error;

use crate::voice::VoiceConnection;

/// Opaque channel identifier, unique within a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity a backend reports after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotUser {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    /// False for channels the bot can see but not join (full, no permission).
    pub joinable: bool,
}

/// Events a backend reports between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The session is established and guilds can be listed.
    Ready,
    /// A channel the bot occupies is going away (deleted, kicked).
    ChannelClosing(ChannelId),
    /// The session died and cannot be resumed. Fatal.
    SessionInvalidated(String),
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("backend is offline")]
    Offline,
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("could not join {channel}: {reason}")]
    JoinFailed { channel: ChannelId, reason: String },
    #[error("session invalidated: {0}")]
    SessionInvalidated(String),
}

/// A chat platform backend. One session at a time; `join` hands over a live
/// voice connection whose streams the player then owns.
pub trait ChatClient {
    fn login(&mut self, token: &str) -> Result<BotUser, ConnectError>;
    fn logout(&mut self);
    fn user(&self) -> Option<&BotUser>;

    fn voice_guilds(&self) -> Vec<GuildInfo>;
    fn voice_channels(&self, guild_id: &str) -> Vec<ChannelInfo>;

    fn join(&mut self, channel: &ChannelId) -> Result<Box<dyn VoiceConnection>, ConnectError>;
    fn leave(&mut self, channel: &ChannelId);

    /// An invite URL for adding the bot to more guilds, when the platform has
    /// such a concept.
    fn invite_link(&self) -> Option<String>;

    /// Drain events accumulated since the last poll.
    fn poll_events(&mut self) -> Vec<ChatEvent>;
}
