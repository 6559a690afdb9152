//! Standalone backend playing through the machine's own speakers.
//!
//! Presents one guild ("Local") with one always-joinable channel
//! ("Speakers") whose voice connection is the rodio output. Any non-empty
//! token logs in, so the application is fully usable without a chat platform
//! account.

use std::sync::mpsc::Sender;

use crate::voice::{LocalVoice, PlayerEvent, VoiceConnection};

use super::client::{
    BotUser, ChannelId, ChannelInfo, ChatClient, ChatEvent, ConnectError, GuildInfo,
};

const GUILD_ID: &str = "local";
const CHANNEL_ID: &str = "local:speakers";

pub struct LocalSession {
    events: Sender<PlayerEvent>,
    finish_poll_ms: u64,
    user: Option<BotUser>,
    pending: Vec<ChatEvent>,
}

impl LocalSession {
    pub fn new(events: Sender<PlayerEvent>, finish_poll_ms: u64) -> Self {
        Self {
            events,
            finish_poll_ms,
            user: None,
            pending: Vec::new(),
        }
    }
}

impl ChatClient for LocalSession {
    fn login(&mut self, token: &str) -> Result<BotUser, ConnectError> {
        if token.trim().is_empty() {
            return Err(ConnectError::LoginRejected("empty token".into()));
        }
        let user = BotUser {
            name: "local".into(),
        };
        self.user = Some(user.clone());
        self.pending.push(ChatEvent::Ready);
        Ok(user)
    }

    fn logout(&mut self) {
        self.user = None;
        self.pending.clear();
    }

    fn user(&self) -> Option<&BotUser> {
        self.user.as_ref()
    }

    fn voice_guilds(&self) -> Vec<GuildInfo> {
        if self.user.is_none() {
            return Vec::new();
        }
        vec![GuildInfo {
            id: GUILD_ID.into(),
            name: "Local".into(),
        }]
    }

    fn voice_channels(&self, guild_id: &str) -> Vec<ChannelInfo> {
        if self.user.is_none() || guild_id != GUILD_ID {
            return Vec::new();
        }
        vec![ChannelInfo {
            id: ChannelId(CHANNEL_ID.into()),
            name: "Speakers".into(),
            joinable: true,
        }]
    }

    fn join(&mut self, channel: &ChannelId) -> Result<Box<dyn VoiceConnection>, ConnectError> {
        if self.user.is_none() {
            return Err(ConnectError::Offline);
        }
        if channel.0 != CHANNEL_ID {
            return Err(ConnectError::JoinFailed {
                channel: channel.clone(),
                reason: "no such channel".into(),
            });
        }
        Ok(Box::new(LocalVoice::spawn(
            self.events.clone(),
            self.finish_poll_ms,
        )))
    }

    fn leave(&mut self, _channel: &ChannelId) {}

    fn invite_link(&self) -> Option<String> {
        None
    }

    fn poll_events(&mut self) -> Vec<ChatEvent> {
        std::mem::take(&mut self.pending)
    }
}
