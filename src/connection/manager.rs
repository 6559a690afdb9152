//! Session and channel state on top of a [`ChatClient`].

use log::{info, warn};

use crate::voice::VoiceConnection;

use super::client::{BotUser, ChannelId, ChannelInfo, ChatClient, ChatEvent, ConnectError, GuildInfo};

/// What the dispatch loop needs to react to after an event poll.
#[derive(Debug)]
pub enum ConnectionNotice {
    /// Logged in and ready; guild and channel lists are valid.
    Ready,
    /// The joined channel went away. Playback must be cancelled.
    ChannelLost(ChannelId),
    /// The session is dead and the application should shut down.
    Fatal(String),
}

struct Joined {
    channel: ChannelInfo,
    voice: Box<dyn VoiceConnection>,
}

pub struct ConnectionManager {
    client: Box<dyn ChatClient>,
    selected_guild: Option<String>,
    joined: Option<Joined>,
}

impl ConnectionManager {
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self {
            client,
            selected_guild: None,
            joined: None,
        }
    }

    pub fn login(&mut self, token: &str) -> Result<BotUser, ConnectError> {
        let user = self.client.login(token)?;
        info!("logged in as {}", user.name);
        Ok(user)
    }

    pub fn logout(&mut self) {
        self.leave_channel();
        self.selected_guild = None;
        self.client.logout();
    }

    pub fn user(&self) -> Option<&BotUser> {
        self.client.user()
    }

    pub fn guilds(&self) -> Vec<GuildInfo> {
        self.client.voice_guilds()
    }

    pub fn select_guild(&mut self, guild_id: &str) {
        self.selected_guild = Some(guild_id.to_owned());
    }

    pub fn selected_guild(&self) -> Option<&str> {
        self.selected_guild.as_deref()
    }

    /// Channels of the selected guild.
    pub fn channels(&self) -> Vec<ChannelInfo> {
        match self.selected_guild.as_deref() {
            Some(guild) => self.client.voice_channels(guild),
            None => Vec::new(),
        }
    }

    /// Join a channel, leaving the current one first. On failure only the
    /// attempted selection is lost; the session stays logged in (the previous
    /// channel was already left by then, matching the backend's state).
    pub fn join_channel(&mut self, channel: &ChannelInfo) -> Result<(), ConnectError> {
        self.leave_channel();
        let voice = self.client.join(&channel.id)?;
        info!("joined voice channel {}", channel.name);
        self.joined = Some(Joined {
            channel: channel.clone(),
            voice,
        });
        Ok(())
    }

    pub fn leave_channel(&mut self) {
        if let Some(joined) = self.joined.take() {
            info!("leaving voice channel {}", joined.channel.name);
            self.client.leave(&joined.channel.id);
        }
    }

    /// The joined channel, if any.
    pub fn channel(&self) -> Option<&ChannelInfo> {
        self.joined.as_ref().map(|j| &j.channel)
    }

    /// The live voice connection for the driving step.
    pub fn voice(&mut self) -> Option<&mut (dyn VoiceConnection + '_)> {
        match self.joined.as_mut() {
            Some(joined) => Some(joined.voice.as_mut()),
            None => None,
        }
    }

    pub fn invite_link(&self) -> Option<String> {
        self.client.invite_link()
    }

    /// Poll the backend and fold its events into notices. A closing channel
    /// only matters when it is the one we occupy; an invalidated session
    /// tears the whole connection down.
    pub fn process_events(&mut self) -> Vec<ConnectionNotice> {
        let mut notices = Vec::new();
        for event in self.client.poll_events() {
            match event {
                ChatEvent::Ready => notices.push(ConnectionNotice::Ready),
                ChatEvent::ChannelClosing(id) => {
                    let ours = self.joined.as_ref().is_some_and(|j| j.channel.id == id);
                    if ours {
                        warn!("voice channel {id} is closing");
                        self.joined = None;
                        notices.push(ConnectionNotice::ChannelLost(id));
                    }
                }
                ChatEvent::SessionInvalidated(reason) => {
                    warn!("session invalidated: {reason}");
                    self.joined = None;
                    self.selected_guild = None;
                    self.client.logout();
                    notices.push(ConnectionNotice::Fatal(reason));
                }
            }
        }
        notices
    }
}
