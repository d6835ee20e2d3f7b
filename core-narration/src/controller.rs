//! # Playback Controller
//!
//! Owns the single live [`PlaybackSession`] and the host audio output. Starting
//! a clip always stops the previous one first, so narration never overlaps.
//!
//! The live session is published on a `watch` channel. The output's
//! completion callback clears it only if the finished voice is still the live
//! one; a late completion from a superseded session is ignored.

use crate::cache::DecodedBuffer;
use crate::error::{NarrationError, Result};
use crate::registry::AudioKey;
use bridge_traits::{AudioOutput, CompletionCallback, OutputState, VoiceId};
use core_async::sync::watch;
use core_async::time::{Duration, Instant};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

/// Unique identity of one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SessionId> for VoiceId {
    fn from(id: SessionId) -> Self {
        VoiceId::from_uuid(id.0)
    }
}

/// One act of playing a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub key: AudioKey,
    pub started_at: Instant,
    pub duration: Duration,
}

impl PlaybackSession {
    /// Time since the session started, capped at the clip length.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed().min(self.duration)
    }
}

/// Single-flight player on top of an [`AudioOutput`].
pub struct PlaybackController {
    output: Arc<dyn AudioOutput>,
    live: Arc<watch::Sender<Option<PlaybackSession>>>,
    /// Serializes stop-then-start so two callers cannot interleave.
    op_lock: Mutex<()>,
    resume_before_play: bool,
}

impl PlaybackController {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        let (live, _) = watch::channel(None);
        Self {
            output,
            live: Arc::new(live),
            op_lock: Mutex::new(()),
            resume_before_play: true,
        }
    }

    pub fn with_resume_before_play(mut self, enabled: bool) -> Self {
        self.resume_before_play = enabled;
        self
    }

    /// Make sure the output can emit sound.
    ///
    /// Returns `true` if a suspended output was resumed.
    ///
    /// # Errors
    ///
    /// [`NarrationError::PlaybackEnvironmentFailure`] if the output is closed
    /// or refuses to resume.
    pub async fn ensure_running(&self) -> Result<bool> {
        match self.output.state() {
            OutputState::Running => Ok(false),
            OutputState::Suspended => {
                debug!("Resuming suspended audio output");
                self.output
                    .resume()
                    .await
                    .map_err(|e| NarrationError::PlaybackEnvironmentFailure(e.to_string()))?;
                info!("Audio output resumed");
                Ok(true)
            }
            OutputState::Closed => Err(NarrationError::PlaybackEnvironmentFailure(
                "audio output is closed".to_string(),
            )),
        }
    }

    /// Stop whatever is playing and play `buffer`, resuming the output first
    /// when configured to.
    ///
    /// One-shot entry point for hosts that drive the controller without a
    /// [`NarrationService`](crate::NarrationService). The service calls
    /// [`ensure_running`](Self::ensure_running) and [`start`](Self::start)
    /// separately so the swap happens under its own transition lock.
    #[instrument(skip(self, buffer), fields(key = %buffer.key()))]
    pub async fn play(&self, buffer: &DecodedBuffer) -> Result<PlaybackSession> {
        if self.resume_before_play {
            self.ensure_running().await?;
        }
        self.start(buffer)
    }

    /// Synchronous half of [`play`](Self::play): stop the live session, then
    /// start `buffer` on the output without resuming it first.
    pub fn start(&self, buffer: &DecodedBuffer) -> Result<PlaybackSession> {
        let _op = self.op_lock.lock();
        self.stop_live();

        let session = PlaybackSession {
            id: SessionId::new(),
            key: buffer.key(),
            started_at: Instant::now(),
            duration: buffer.duration(),
        };

        // Published before `start` so a completion fired from inside the
        // output call already finds its session.
        self.live.send_replace(Some(session.clone()));

        let on_ended = completion_callback(Arc::clone(&self.live), session.id);
        if let Err(e) = self
            .output
            .start(session.id.into(), buffer.clip().clone(), on_ended)
        {
            self.live.send_if_modified(|live| clear_if_current(live, session.id));
            warn!(error = %e, "Audio output refused to start");
            return Err(NarrationError::PlaybackEnvironmentFailure(e.to_string()));
        }

        info!(
            session = %session.id,
            duration_ms = session.duration.as_millis() as u64,
            "Playback started"
        );
        Ok(session)
    }

    /// Stop the live session, if any. Idempotent.
    pub fn stop(&self) -> Option<PlaybackSession> {
        let _op = self.op_lock.lock();
        self.stop_live()
    }

    fn stop_live(&self) -> Option<PlaybackSession> {
        let mut previous = None;
        self.live.send_if_modified(|live| {
            previous = live.take();
            previous.is_some()
        });

        if let Some(session) = &previous {
            self.output.stop(session.id.into());
            debug!(session = %session.id, key = %session.key, "Playback stopped");
        }
        previous
    }

    pub fn current(&self) -> Option<PlaybackSession> {
        self.live.borrow().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.live.borrow().is_some()
    }

    /// Elapsed time of the live session.
    pub fn elapsed(&self) -> Option<Duration> {
        self.live.borrow().as_ref().map(PlaybackSession::elapsed)
    }

    /// Observe session changes: `Some` on start, `None` on stop or natural end.
    pub fn subscribe(&self) -> watch::Receiver<Option<PlaybackSession>> {
        self.live.subscribe()
    }

    pub fn output_state(&self) -> OutputState {
        self.output.state()
    }

    /// Stop playback and release the output device.
    pub fn close(&self) {
        self.stop();
        self.output.close();
        debug!("Playback controller closed");
    }
}

fn completion_callback(
    live: Arc<watch::Sender<Option<PlaybackSession>>>,
    id: SessionId,
) -> CompletionCallback {
    Box::new(move || {
        if live.send_if_modified(|current| clear_if_current(current, id)) {
            debug!(session = %id, "Playback completed");
        } else {
            trace!(session = %id, "Ignoring completion of a stale session");
        }
    })
}

fn clear_if_current(live: &mut Option<PlaybackSession>, id: SessionId) -> bool {
    match live {
        Some(session) if session.id == id => {
            *live = None;
            true
        }
        _ => false,
    }
}
