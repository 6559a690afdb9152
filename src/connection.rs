//! Chat platform session and voice channel lifecycle.
//!
//! The rest of the application only ever sees the [`ChatClient`] trait and
//! the [`ConnectionManager`] wrapped around it. The manager tracks which
//! guild is selected and which channel is joined, reverts cleanly when a join
//! fails and translates platform events into notices the dispatch loop acts
//! on.

mod client;
mod local;
mod manager;

pub use client::{
    BotUser, ChannelId, ChannelInfo, ChatClient, ChatEvent, ConnectError, GuildInfo,
};
pub use local::LocalSession;
pub use manager::{ConnectionManager, ConnectionNotice};

#[cfg(test)]
mod tests;
