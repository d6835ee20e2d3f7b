//! Narration state published to the UI.

use crate::captions::CaptionView;
use crate::controller::{PlaybackSession, SessionId};
use crate::registry::{AudioKey, NarrationAsset, WordTiming};
use serde::{Deserialize, Serialize};

/// Snapshot of what the narrator is doing.
///
/// `current_time` only means something while `is_speaking` is true; once it
/// turns false the last value is left in place and should be ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationState {
    pub is_speaking: bool,
    pub current_text: String,
    pub current_word_timings: Vec<WordTiming>,
    /// Seconds since the current session started.
    pub current_time: f64,
    pub current_key: Option<AudioKey>,
    pub session: Option<SessionId>,
    /// Cleared for the rest of the session once the audio output has failed.
    pub narration_available: bool,
}

impl Default for NarrationState {
    fn default() -> Self {
        Self {
            is_speaking: false,
            current_text: String::new(),
            current_word_timings: Vec::new(),
            current_time: 0.0,
            current_key: None,
            session: None,
            narration_available: true,
        }
    }
}

impl NarrationState {
    /// Caption for the current instant.
    pub fn caption(&self) -> CaptionView<'_> {
        CaptionView::derive(&self.current_word_timings, &self.current_text, self.current_time)
    }

    pub(crate) fn is_session(&self, id: SessionId) -> bool {
        self.session == Some(id)
    }

    pub(crate) fn begin(&mut self, asset: &NarrationAsset, session: &PlaybackSession) {
        self.is_speaking = true;
        self.current_text = asset.transcript.clone();
        self.current_word_timings = asset.word_timings.clone();
        self.current_time = 0.0;
        self.current_key = Some(asset.key);
        self.session = Some(session.id);
    }

    /// Show `asset`'s transcript without audio.
    pub(crate) fn show_text_only(&mut self, asset: &NarrationAsset) {
        self.is_speaking = false;
        self.current_text = asset.transcript.clone();
        self.current_word_timings = Vec::new();
        self.current_time = 0.0;
        self.current_key = Some(asset.key);
        self.session = None;
    }

    /// Mark speaking as finished. Returns whether anything changed.
    pub(crate) fn end_speaking(&mut self) -> bool {
        let changed = self.is_speaking || self.session.is_some();
        self.is_speaking = false;
        self.session = None;
        changed
    }

    /// Reset text, timings and time. Returns whether anything changed.
    pub(crate) fn clear_caption(&mut self) -> bool {
        let changed = !self.current_text.is_empty()
            || !self.current_word_timings.is_empty()
            || self.current_time != 0.0
            || self.current_key.is_some();
        self.current_text.clear();
        self.current_word_timings.clear();
        self.current_time = 0.0;
        self.current_key = None;
        changed
    }
}
