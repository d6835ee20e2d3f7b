//! # Caption Synchronizer
//!
//! Pure derivation of what a caption should show at a given playback time.
//! Nothing here holds state; callers recompute on every `current_time` update.

use crate::registry::WordTiming;

/// One piece of a rendered caption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Caption<'a> {
    /// Untimed transcript, shown verbatim.
    Plain(&'a str),
    /// A revealed word; `active` marks the one being spoken right now.
    Word { timing: &'a WordTiming, active: bool },
}

/// Caption state at one instant.
///
/// ```rust
/// use core_narration::{CaptionView, WordTiming};
///
/// let timings = vec![
///     WordTiming::new("Olá,", 0.0, 1.5),
///     WordTiming::new("mundo!", 1.5, 3.0),
/// ];
/// let view = CaptionView::derive(&timings, "Olá, mundo!", 2.0);
///
/// assert_eq!(view.visible_words().len(), 2);
/// assert_eq!(view.active_word().map(|w| w.text.as_str()), Some("mundo!"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionView<'a> {
    transcript: &'a str,
    timings: &'a [WordTiming],
    /// Indices into `timings` whose start has passed.
    visible: Vec<usize>,
    active: Option<usize>,
}

impl<'a> CaptionView<'a> {
    /// Derive the caption for `current_time` seconds into the clip.
    ///
    /// A word is visible once `start <= current_time` and active while
    /// `start <= current_time < end`. Timings that overlap or arrive out of
    /// order are tolerated: visibility is decided per word and only the first
    /// matching word is active.
    pub fn derive(timings: &'a [WordTiming], transcript: &'a str, current_time: f64) -> Self {
        let visible: Vec<usize> = timings
            .iter()
            .enumerate()
            .filter(|(_, timing)| timing.has_started(current_time))
            .map(|(index, _)| index)
            .collect();
        let active = visible
            .iter()
            .copied()
            .find(|&index| timings[index].is_active(current_time));

        Self {
            transcript,
            timings,
            visible,
            active,
        }
    }

    /// No timings: the whole transcript is shown without highlighting.
    pub fn is_plain(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn visible_words(&self) -> Vec<&'a WordTiming> {
        self.visible.iter().map(|&index| &self.timings[index]).collect()
    }

    pub fn active_word(&self) -> Option<&'a WordTiming> {
        self.active.map(|index| &self.timings[index])
    }

    /// Ordered segments for a renderer.
    pub fn segments(&self) -> Vec<Caption<'a>> {
        if self.is_plain() {
            return vec![Caption::Plain(self.transcript)];
        }
        self.visible
            .iter()
            .map(|&index| Caption::Word {
                timing: &self.timings[index],
                active: self.active == Some(index),
            })
            .collect()
    }

    /// The visible words joined with single spaces.
    pub fn text(&self) -> String {
        if self.is_plain() {
            return self.transcript.to_string();
        }
        self.visible
            .iter()
            .map(|&index| self.timings[index].text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
