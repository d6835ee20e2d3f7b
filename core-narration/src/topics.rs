//! # Topics and Quiz Narration
//!
//! The hub shows three topics around the sun. Each opens a popup with its own
//! narration, and they unlock in a fixed order.

use crate::registry::AudioKey;
use core_runtime::events::{CoreEvent, EventBus, ProgressEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// A topic on the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Temperature,
    Composition,
    Neighbors,
}

/// Popup descriptor for a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicContent {
    pub topic: Topic,
    pub title: &'static str,
    pub narration: AudioKey,
}

impl Topic {
    /// Unlock order.
    pub const ALL: [Topic; 3] = [Topic::Temperature, Topic::Composition, Topic::Neighbors];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Temperature => "temperature",
            Topic::Composition => "composition",
            Topic::Neighbors => "neighbors",
        }
    }

    pub fn content(&self) -> TopicContent {
        let (title, narration) = match self {
            Topic::Temperature => ("Minha Temperatura", AudioKey::TemperatureTopic),
            Topic::Composition => ("Do que sou feito?", AudioKey::CompositionTopic),
            Topic::Neighbors => ("Meus Vizinhos", AudioKey::NeighborsTopic),
        };
        TopicContent {
            topic: *self,
            title,
            narration,
        }
    }

    /// Topic that has to be visited before this one opens.
    pub fn prerequisite(&self) -> Option<Topic> {
        match self {
            Topic::Temperature => None,
            Topic::Composition => Some(Topic::Temperature),
            Topic::Neighbors => Some(Topic::Composition),
        }
    }
}

/// Which topics a visitor has opened.
#[derive(Debug, Default)]
pub struct TopicProgress {
    visited: BTreeSet<Topic>,
    events: Option<EventBus>,
}

impl TopicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_unlocked(&self, topic: Topic) -> bool {
        topic
            .prerequisite()
            .map_or(true, |required| self.visited.contains(&required))
    }

    pub fn is_visited(&self, topic: Topic) -> bool {
        self.visited.contains(&topic)
    }

    /// Record a visit. Locked topics are ignored and return `None`; otherwise
    /// the topic's popup content is returned.
    pub fn visit(&mut self, topic: Topic) -> Option<TopicContent> {
        if !self.is_unlocked(topic) {
            debug!(topic = topic.as_str(), "Ignoring visit to locked topic");
            return None;
        }

        if self.visited.insert(topic) {
            self.emit(ProgressEvent::TopicVisited {
                topic: topic.as_str().to_string(),
            });
            for unlocked in Topic::ALL
                .into_iter()
                .filter(|t| t.prerequisite() == Some(topic))
            {
                self.emit(ProgressEvent::TopicUnlocked {
                    topic: unlocked.as_str().to_string(),
                });
            }
        }
        Some(topic.content())
    }

    pub fn unlocked(&self) -> Vec<Topic> {
        Topic::ALL
            .into_iter()
            .filter(|topic| self.is_unlocked(*topic))
            .collect()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// All topics seen; the quiz becomes available.
    pub fn all_visited(&self) -> bool {
        self.visited.len() == Topic::ALL.len()
    }

    /// Forget all visits, for "play again".
    pub fn reset(&mut self) {
        self.visited.clear();
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Progress(event));
        }
    }
}

/// Narration used by the quiz screen.
pub struct QuizNarration;

impl QuizNarration {
    pub const QUESTION: AudioKey = AudioKey::QuizQuestion;

    pub fn for_answer(correct: bool) -> AudioKey {
        if correct {
            AudioKey::QuizCorrect
        } else {
            AudioKey::QuizWrong
        }
    }
}
