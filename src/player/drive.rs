//! Reactive driving step.

use crate::voice::{VoiceConnection, VoiceError};

use super::model::{Player, PlayerAction};

impl Player {
    /// Advance playback against the current voice connection.
    ///
    /// Idempotent: call it whenever `(channel, queue, playing)` may have
    /// changed. Without a channel any playback in flight is cancelled; with
    /// one, the queue head is started as soon as nothing is playing.
    ///
    /// A stream-creation failure is returned as a recoverable error: nothing
    /// is marked playing and the queue head stays in place so the next step
    /// can retry.
    pub fn drive(
        &mut self,
        conn: Option<&mut dyn VoiceConnection>,
    ) -> Result<bool, VoiceError> {
        let Some(conn) = conn.filter(|_| self.channel_open) else {
            if self.playing.is_some() || !self.queue.is_empty() {
                self.apply(PlayerAction::Stop);
            }
            return Ok(false);
        };

        if self.queue.is_empty() || self.playing.is_some() {
            return Ok(false);
        }

        let id = self.next_stream_id;
        self.next_stream_id += 1;
        let path = self.queue[0].path.clone();
        let stream = conn.play(&path, id)?;
        self.apply(PlayerAction::StreamStarted { id, stream });
        Ok(true)
    }
}
