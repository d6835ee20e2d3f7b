//! Audio output using `rodio` on a dedicated thread.
//!
//! `rodio::OutputStream` is `!Send` on some platforms (CoreAudio among them),
//! so the stream lives on one OS thread for its entire lifetime and every
//! operation is proxied to it through a command channel. The handle itself is
//! `Send + Sync` and can be shared with the async core.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{AudioOutput, CompletionCallback, OutputState, PcmClip, VoiceId},
};
use parking_lot::Mutex;
use rodio::{buffer::SamplesBuffer, OutputStream, Sink};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, info, warn};

enum OutputCommand {
    Start {
        voice: VoiceId,
        clip: PcmClip,
        on_ended: CompletionCallback,
        reply: mpsc::Sender<Result<()>>,
    },
    Stop {
        voice: VoiceId,
    },
    /// Sent by a completion watcher once its sink has drained.
    Finished {
        voice: VoiceId,
    },
    Suspend,
    Resume {
        reply: core_async::sync::oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// A started clip owned by the audio thread.
struct Voice {
    sink: Arc<Sink>,
    /// Cleared by `stop` so the watcher can tell a drain from an interruption.
    playing: Arc<AtomicBool>,
}

#[derive(Debug)]
struct Shared {
    state: OutputState,
    unavailable: Option<String>,
}

/// `rodio`-backed [`AudioOutput`] for desktop hosts.
///
/// The default output device is opened on the audio thread when the handle is
/// created. If no device can be opened the output reports
/// [`OutputState::Closed`] and every `start` fails with
/// [`BridgeError::NotAvailable`], letting the core fall back to text-only
/// narration.
pub struct RodioAudioOutput {
    cmd_tx: mpsc::Sender<OutputCommand>,
    shared: Arc<Mutex<Shared>>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl RodioAudioOutput {
    /// Spawn the audio thread and open the default output device.
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<OutputCommand>();
        let (init_tx, init_rx) = mpsc::channel::<std::result::Result<(), String>>();
        let shared = Arc::new(Mutex::new(Shared {
            state: OutputState::Closed,
            unavailable: None,
        }));

        let loop_tx = cmd_tx.clone();
        let loop_shared = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("narration-audio".into())
            .spawn(move || Self::run(cmd_rx, loop_tx, loop_shared, init_tx));

        let thread = match spawned {
            Ok(handle) => {
                let init = init_rx
                    .recv()
                    .unwrap_or_else(|_| Err("audio thread exited during startup".to_string()));
                Self::record_init(&shared, init);
                Some(handle)
            }
            Err(e) => {
                Self::record_init(&shared, Err(format!("failed to spawn audio thread: {e}")));
                None
            }
        };

        Self {
            cmd_tx,
            shared,
            thread: Mutex::new(thread),
        }
    }

    /// Pause every voice and mark the device suspended until [`resume`](AudioOutput::resume).
    pub fn suspend(&self) {
        let _ = self.cmd_tx.send(OutputCommand::Suspend);
    }

    fn record_init(shared: &Mutex<Shared>, init: std::result::Result<(), String>) {
        let mut shared = shared.lock();
        match init {
            Ok(()) => shared.state = OutputState::Running,
            Err(reason) => {
                warn!(%reason, "Audio output unavailable");
                shared.state = OutputState::Closed;
                shared.unavailable = Some(reason);
            }
        }
    }

    fn unavailable(&self) -> BridgeError {
        let reason = self
            .shared
            .lock()
            .unavailable
            .clone()
            .unwrap_or_else(|| "audio output closed".to_string());
        BridgeError::NotAvailable(reason)
    }

    fn run(
        cmd_rx: mpsc::Receiver<OutputCommand>,
        cmd_tx: mpsc::Sender<OutputCommand>,
        shared: Arc<Mutex<Shared>>,
        init_tx: mpsc::Sender<std::result::Result<(), String>>,
    ) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                let _ = init_tx.send(Err(e.to_string()));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }
        info!("Audio output initialized on default device");

        let mut voices: HashMap<VoiceId, Voice> = HashMap::new();

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                OutputCommand::Start {
                    voice,
                    clip,
                    on_ended,
                    reply,
                } => {
                    let result = Sink::try_new(&handle)
                        .map_err(|e| BridgeError::OperationFailed(e.to_string()))
                        .map(|sink| {
                            let source =
                                SamplesBuffer::new(clip.channels, clip.sample_rate, clip.samples.to_vec());
                            sink.append(source);
                            if shared.lock().state == OutputState::Suspended {
                                sink.pause();
                            }

                            let entry = Voice {
                                sink: Arc::new(sink),
                                playing: Arc::new(AtomicBool::new(true)),
                            };
                            Self::spawn_completion_watcher(voice, &entry, on_ended, cmd_tx.clone());
                            voices.insert(voice, entry);
                            debug!(voice = %voice.as_uuid(), frames = clip.frames(), "Voice started");
                        });
                    let _ = reply.send(result);
                }
                OutputCommand::Stop { voice } => {
                    if let Some(entry) = voices.remove(&voice) {
                        entry.playing.store(false, Ordering::SeqCst);
                        entry.sink.stop();
                        debug!(voice = %voice.as_uuid(), "Voice stopped");
                    }
                }
                OutputCommand::Finished { voice } => {
                    voices.remove(&voice);
                }
                OutputCommand::Suspend => {
                    for entry in voices.values() {
                        entry.sink.pause();
                    }
                    shared.lock().state = OutputState::Suspended;
                }
                OutputCommand::Resume { reply } => {
                    for entry in voices.values() {
                        entry.sink.play();
                    }
                    shared.lock().state = OutputState::Running;
                    let _ = reply.send(Ok(()));
                }
                OutputCommand::Shutdown => break,
            }
        }

        for (_, entry) in voices.drain() {
            entry.playing.store(false, Ordering::SeqCst);
            entry.sink.stop();
        }
        shared.lock().state = OutputState::Closed;
        info!("Audio output closed");
    }

    /// Block a helper thread on the sink and fire `on_ended` on natural drain.
    ///
    /// `sleep_until_end` also returns after `Sink::stop`; the `playing` flag is
    /// already cleared in that case and the callback is dropped unfired.
    fn spawn_completion_watcher(
        voice: VoiceId,
        entry: &Voice,
        on_ended: CompletionCallback,
        cmd_tx: mpsc::Sender<OutputCommand>,
    ) {
        let sink = Arc::clone(&entry.sink);
        let playing = Arc::clone(&entry.playing);

        thread::spawn(move || {
            sink.sleep_until_end();
            if !playing.swap(false, Ordering::SeqCst) {
                return;
            }
            let _ = cmd_tx.send(OutputCommand::Finished { voice });
            debug!(voice = %voice.as_uuid(), "Voice finished naturally");
            on_ended();
        });
    }
}

impl Default for RodioAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    fn state(&self) -> OutputState {
        self.shared.lock().state
    }

    async fn resume(&self) -> Result<()> {
        match self.state() {
            OutputState::Running => Ok(()),
            OutputState::Closed => Err(self.unavailable()),
            OutputState::Suspended => {
                let (reply, rx) = core_async::sync::oneshot::channel();
                self.cmd_tx
                    .send(OutputCommand::Resume { reply })
                    .map_err(|_| self.unavailable())?;
                rx.await.map_err(|_| self.unavailable())?
            }
        }
    }

    fn start(&self, voice: VoiceId, clip: PcmClip, on_ended: CompletionCallback) -> Result<()> {
        if self.state() == OutputState::Closed {
            return Err(self.unavailable());
        }

        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(OutputCommand::Start {
                voice,
                clip,
                on_ended,
                reply,
            })
            .map_err(|_| self.unavailable())?;
        rx.recv().map_err(|_| self.unavailable())?
    }

    fn stop(&self, voice: VoiceId) {
        let _ = self.cmd_tx.send(OutputCommand::Stop { voice });
    }

    fn close(&self) {
        let _ = self.cmd_tx.send(OutputCommand::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
        self.shared.lock().state = OutputState::Closed;
    }
}

impl Drop for RodioAudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Audio devices are not guaranteed on CI; these tests only rely on the
    // handle honoring its own state contract.

    #[test]
    fn test_closed_output_rejects_start() {
        let output = RodioAudioOutput::new();
        output.close();

        assert_eq!(output.state(), OutputState::Closed);
        let clip = PcmClip::new(vec![0.0f32; 64], 8_000, 1);
        let err = output
            .start(VoiceId::new(), clip, Box::new(|| {}))
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_closed_output_cannot_resume() {
        let output = RodioAudioOutput::new();
        output.close();
        assert!(output.resume().await.is_err());
    }

    #[test]
    fn test_stop_unknown_voice_is_ignored() {
        let output = RodioAudioOutput::new();
        output.stop(VoiceId::new());
        output.close();
    }
}
