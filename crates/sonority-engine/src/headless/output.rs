//! Device output for the headless engine.
//!
//! rodio's output stream is not `Send`, so it lives on a dedicated thread.
//! The engine drives it with commands over a channel and never waits on it.

use crate::error::{EngineError, EngineResult};
use crossbeam_channel::{unbounded, Receiver, Sender};
use rodio::{Decoder, OutputStream, Sink, Source};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Key identifying a voice on the output thread.
pub(crate) type VoiceKey = u64;

/// Playback request for one voice.
pub(crate) struct StartVoice {
    pub key: VoiceKey,
    pub bytes: Arc<[u8]>,
    pub looping: bool,
    pub paused: bool,
    pub volume: f32,
    pub speed: f32,
    pub offset: Duration,
}

pub(crate) enum OutputCommand {
    Start(StartVoice),
    SetPaused(VoiceKey, bool),
    SetVolume(VoiceKey, f32),
    SetSpeed(VoiceKey, f32),
    Stop(VoiceKey),
    Shutdown,
}

/// Handle to the output thread.
pub(crate) struct OutputThread {
    sender: Sender<OutputCommand>,
    thread: Option<JoinHandle<()>>,
}

impl OutputThread {
    /// Opens the default device on a new thread.
    pub(crate) fn spawn() -> EngineResult<Self> {
        let (sender, receiver) = unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let thread = std::thread::Builder::new()
            .name("sonority-output".into())
            .spawn(move || run(&receiver, &ready_tx))
            .map_err(|e| EngineError::Output(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Audio output device opened");
                Ok(Self {
                    sender,
                    thread: Some(thread),
                })
            },
            Ok(Err(message)) => {
                let _ = thread.join();
                Err(EngineError::Output(message))
            },
            Err(e) => Err(EngineError::Output(e.to_string())),
        }
    }

    pub(crate) fn send(&self, command: OutputCommand) {
        if self.sender.send(command).is_err() {
            warn!("Audio output thread is gone");
        }
    }
}

impl Drop for OutputThread {
    fn drop(&mut self) {
        let _ = self.sender.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

fn run(receiver: &Receiver<OutputCommand>, ready: &Sender<Result<(), String>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        },
    };
    let _ = ready.send(Ok(()));

    let mut sinks: HashMap<VoiceKey, Sink> = HashMap::new();

    while let Ok(command) = receiver.recv() {
        match command {
            OutputCommand::Start(start) => {
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        warn!("Failed to create audio sink: {e}");
                        continue;
                    },
                };
                let decoder = match Decoder::new(Cursor::new(start.bytes)) {
                    Ok(decoder) => decoder,
                    Err(e) => {
                        warn!("Failed to decode voice {}: {e}", start.key);
                        continue;
                    },
                };
                sink.set_volume(start.volume);
                sink.set_speed(start.speed);
                if start.paused {
                    sink.pause();
                }
                if start.looping {
                    sink.append(decoder.skip_duration(start.offset).repeat_infinite());
                } else {
                    sink.append(decoder.skip_duration(start.offset));
                }
                sinks.insert(start.key, sink);
            },
            OutputCommand::SetPaused(key, paused) => {
                if let Some(sink) = sinks.get(&key) {
                    if paused {
                        sink.pause();
                    } else {
                        sink.play();
                    }
                }
            },
            OutputCommand::SetVolume(key, volume) => {
                if let Some(sink) = sinks.get(&key) {
                    sink.set_volume(volume);
                }
            },
            OutputCommand::SetSpeed(key, speed) => {
                if let Some(sink) = sinks.get(&key) {
                    sink.set_speed(speed);
                }
            },
            OutputCommand::Stop(key) => {
                if let Some(sink) = sinks.remove(&key) {
                    sink.stop();
                }
            },
            OutputCommand::Shutdown => break,
        }
        sinks.retain(|_, sink| !sink.empty());
    }

    debug!("Audio output thread exiting with {} sinks", sinks.len());
}
