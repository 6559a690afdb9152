//! Local-device voice backend.
//!
//! Streams "into" the machine's own speakers through rodio instead of a chat
//! platform. The output thread owns the rodio `OutputStream` and all sinks;
//! commands arrive over a channel and a periodic check reports drained sinks
//! as finished streams.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use super::{OutgoingStream, PlayerEvent, StreamId, VoiceConnection, VoiceError};

enum LocalCmd {
    Open {
        path: PathBuf,
        id: StreamId,
        reply: Sender<Result<(), VoiceError>>,
    },
    Pause(StreamId),
    Resume(StreamId),
    Destroy(StreamId),
}

/// Handle to the local output thread. Dropping it (together with any live
/// stream handles) shuts the thread down.
pub struct LocalVoice {
    tx: Sender<LocalCmd>,
}

impl LocalVoice {
    pub fn spawn(events: Sender<PlayerEvent>, finish_poll_ms: u64) -> Self {
        let (tx, rx) = mpsc::channel::<LocalCmd>();
        thread::spawn(move || run(rx, events, finish_poll_ms.max(1)));
        Self { tx }
    }
}

impl VoiceConnection for LocalVoice {
    fn play(
        &mut self,
        path: &Path,
        id: StreamId,
    ) -> Result<Box<dyn OutgoingStream>, VoiceError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(LocalCmd::Open {
                path: path.to_path_buf(),
                id,
                reply: reply_tx,
            })
            .map_err(|_| VoiceError::Unavailable("local output thread is gone".into()))?;

        match reply_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(res) => res?,
            Err(_) => {
                return Err(VoiceError::Unavailable(
                    "local output thread did not answer".into(),
                ));
            }
        }

        Ok(Box::new(LocalStream {
            id,
            tx: self.tx.clone(),
        }))
    }
}

struct LocalStream {
    id: StreamId,
    tx: Sender<LocalCmd>,
}

impl OutgoingStream for LocalStream {
    fn pause(&mut self) {
        let _ = self.tx.send(LocalCmd::Pause(self.id));
    }

    fn resume(&mut self) {
        let _ = self.tx.send(LocalCmd::Resume(self.id));
    }

    fn destroy(&mut self) {
        let _ = self.tx.send(LocalCmd::Destroy(self.id));
    }
}

fn run(rx: Receiver<LocalCmd>, events: Sender<PlayerEvent>, finish_poll_ms: u64) {
    let mut stream =
        OutputStreamBuilder::open_default_stream().expect("ERR: No audio output device");
    // rodio logs to stderr when OutputStream is dropped. That's useful in
    // debugging, but noisy for a TUI app.
    stream.log_on_drop(false);

    let mut sinks: HashMap<StreamId, Sink> = HashMap::new();

    loop {
        match rx.recv_timeout(Duration::from_millis(finish_poll_ms)) {
            Ok(LocalCmd::Open { path, id, reply }) => {
                let res = open_sink(&stream, &path).map(|sink| {
                    sinks.insert(id, sink);
                });
                let _ = reply.send(res);
            }
            Ok(LocalCmd::Pause(id)) => {
                if let Some(s) = sinks.get(&id) {
                    s.pause();
                }
            }
            Ok(LocalCmd::Resume(id)) => {
                if let Some(s) = sinks.get(&id) {
                    s.play();
                }
            }
            Ok(LocalCmd::Destroy(id)) => {
                if let Some(s) = sinks.remove(&id) {
                    s.stop();
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // A drained, unpaused sink means the stream played to the end.
                let finished: Vec<StreamId> = sinks
                    .iter()
                    .filter(|(_, s)| s.empty() && !s.is_paused())
                    .map(|(id, _)| *id)
                    .collect();
                for id in finished {
                    sinks.remove(&id);
                    debug!("local stream {id} finished");
                    if events.send(PlayerEvent::StreamFinished(id)).is_err() {
                        warn!("player event channel closed, stopping local output thread");
                        return;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn open_sink(stream: &OutputStream, path: &Path) -> Result<Sink, VoiceError> {
    let file = File::open(path).map_err(|source| VoiceError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let source = Decoder::new(BufReader::new(file)).map_err(|_| VoiceError::Decode {
        path: path.to_path_buf(),
    })?;

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.play();
    Ok(sink)
}
