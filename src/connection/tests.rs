use std::path::Path;

use super::*;
use crate::voice::{OutgoingStream, StreamId, VoiceConnection, VoiceError};

struct NullVoice;

impl VoiceConnection for NullVoice {
    fn play(
        &mut self,
        path: &Path,
        _id: StreamId,
    ) -> Result<Box<dyn OutgoingStream>, VoiceError> {
        Err(VoiceError::Decode {
            path: path.to_path_buf(),
        })
    }
}

#[derive(Default)]
struct FakeClient {
    user: Option<BotUser>,
    pending: Vec<ChatEvent>,
    reject_join: bool,
    left: Vec<ChannelId>,
}

impl ChatClient for FakeClient {
    fn login(&mut self, token: &str) -> Result<BotUser, ConnectError> {
        if token == "bad" {
            return Err(ConnectError::LoginRejected("bad token".into()));
        }
        let user = BotUser { name: "bot".into() };
        self.user = Some(user.clone());
        Ok(user)
    }

    fn logout(&mut self) {
        self.user = None;
    }

    fn user(&self) -> Option<&BotUser> {
        self.user.as_ref()
    }

    fn voice_guilds(&self) -> Vec<GuildInfo> {
        vec![GuildInfo {
            id: "g1".into(),
            name: "Guild One".into(),
        }]
    }

    fn voice_channels(&self, _guild_id: &str) -> Vec<ChannelInfo> {
        vec![
            ChannelInfo {
                id: ChannelId("c1".into()),
                name: "General".into(),
                joinable: true,
            },
            ChannelInfo {
                id: ChannelId("c2".into()),
                name: "AFK".into(),
                joinable: false,
            },
        ]
    }

    fn join(&mut self, channel: &ChannelId) -> Result<Box<dyn VoiceConnection>, ConnectError> {
        if self.reject_join {
            return Err(ConnectError::JoinFailed {
                channel: channel.clone(),
                reason: "refused".into(),
            });
        }
        Ok(Box::new(NullVoice))
    }

    fn leave(&mut self, channel: &ChannelId) {
        self.left.push(channel.clone());
    }

    fn invite_link(&self) -> Option<String> {
        Some("https://example.invalid/invite".into())
    }

    fn poll_events(&mut self) -> Vec<ChatEvent> {
        std::mem::take(&mut self.pending)
    }
}

fn joined_manager() -> ConnectionManager {
    let mut mgr = ConnectionManager::new(Box::new(FakeClient::default()));
    mgr.login("ok").unwrap();
    mgr.select_guild("g1");
    let channel = mgr.channels()[0].clone();
    mgr.join_channel(&channel).unwrap();
    mgr
}

#[test]
fn login_then_join_exposes_channel_and_voice() {
    let mut mgr = joined_manager();
    assert_eq!(mgr.user().unwrap().name, "bot");
    assert_eq!(mgr.channel().unwrap().name, "General");

    // The borrowed connection is usable for playback calls.
    let voice = mgr.voice().unwrap();
    let res = voice.play(Path::new("/sounds/horn.mp3"), 1);
    assert!(matches!(res, Err(VoiceError::Decode { .. })));

    // And can be taken again after the borrow ends.
    assert!(mgr.voice().is_some());
    mgr.leave_channel();
    assert!(mgr.voice().is_none());
}

#[test]
fn logout_leaves_the_channel_and_clears_the_session() {
    let mut mgr = joined_manager();
    mgr.logout();
    assert!(mgr.user().is_none());
    assert!(mgr.channel().is_none());
    assert!(mgr.selected_guild().is_none());
}

#[test]
fn failed_login_leaves_no_session() {
    let mut mgr = ConnectionManager::new(Box::new(FakeClient::default()));
    assert!(mgr.login("bad").is_err());
    assert!(mgr.user().is_none());
}

#[test]
fn failed_join_only_reverts_the_selection() {
    let mut mgr = ConnectionManager::new(Box::new(FakeClient {
        reject_join: true,
        ..FakeClient::default()
    }));
    mgr.login("ok").unwrap();
    mgr.select_guild("g1");
    let channel = mgr.channels()[0].clone();

    assert!(mgr.join_channel(&channel).is_err());
    assert!(mgr.channel().is_none());
    assert!(mgr.voice().is_none());
    // Still logged in and able to browse.
    assert!(mgr.user().is_some());
    assert_eq!(mgr.selected_guild(), Some("g1"));
}

#[test]
fn joining_another_channel_leaves_the_first() {
    let mut mgr = joined_manager();
    let afk = mgr.channels()[1].clone();
    mgr.join_channel(&afk).unwrap();
    assert_eq!(mgr.channel().unwrap().name, "AFK");
}

#[test]
fn closing_of_our_channel_clears_the_join() {
    let mut mgr = ConnectionManager::new(Box::new(FakeClient {
        pending: vec![ChatEvent::ChannelClosing(ChannelId("c1".into()))],
        ..FakeClient::default()
    }));
    mgr.login("ok").unwrap();
    mgr.select_guild("g1");
    let channel = mgr.channels()[0].clone();
    mgr.join_channel(&channel).unwrap();

    let notices = mgr.process_events();
    assert!(matches!(
        notices.as_slice(),
        [ConnectionNotice::ChannelLost(id)] if id.0 == "c1"
    ));
    assert!(mgr.channel().is_none());
}

#[test]
fn closing_of_an_unrelated_channel_is_ignored() {
    let mut mgr = ConnectionManager::new(Box::new(FakeClient {
        pending: vec![ChatEvent::ChannelClosing(ChannelId("c9".into()))],
        ..FakeClient::default()
    }));
    mgr.login("ok").unwrap();
    mgr.select_guild("g1");
    let channel = mgr.channels()[0].clone();
    mgr.join_channel(&channel).unwrap();

    assert!(mgr.process_events().is_empty());
    assert!(mgr.channel().is_some());
}

#[test]
fn invalidated_session_is_fatal_and_logs_out() {
    let mut mgr = ConnectionManager::new(Box::new(FakeClient {
        pending: vec![ChatEvent::SessionInvalidated("revoked".into())],
        ..FakeClient::default()
    }));
    mgr.login("ok").unwrap();
    mgr.select_guild("g1");
    let channel = mgr.channels()[0].clone();
    mgr.join_channel(&channel).unwrap();

    let notices = mgr.process_events();
    assert!(matches!(
        notices.as_slice(),
        [ConnectionNotice::Fatal(reason)] if reason == "revoked"
    ));
    assert!(mgr.user().is_none());
    assert!(mgr.channel().is_none());
    assert!(mgr.selected_guild().is_none());
}

#[test]
fn local_session_rejects_empty_tokens_and_lists_the_speakers() {
    let (tx, _rx) = std::sync::mpsc::channel();
    let mut session = LocalSession::new(tx, 200);

    assert!(session.login("  ").is_err());
    assert!(session.voice_guilds().is_empty());

    session.login("anything").unwrap();
    let guilds = session.voice_guilds();
    assert_eq!(guilds.len(), 1);
    assert_eq!(guilds[0].name, "Local");

    let channels = session.voice_channels(&guilds[0].id);
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].name, "Speakers");
    assert!(channels[0].joinable);

    assert_eq!(session.poll_events(), vec![ChatEvent::Ready]);
    assert!(session.poll_events().is_empty());
}
