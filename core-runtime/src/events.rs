//! # Event Bus System
//!
//! Provides an event-driven architecture for the narration core using
//! `tokio::sync::broadcast`. UI shells, analytics and tests observe what the
//! narrator does without being wired into it.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐
//! │ NarrationService ├──────────>│           │   subscribe   ┌────────────┐
//! └──────────────────┘           │ EventBus  ├──────────────>│ Subscriber │
//! ┌──────────────────┐   emit    │ (broadcast│               └────────────┘
//! │  TopicProgress   ├──────────>│  channel) │
//! └──────────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, NarrationEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Narration(NarrationEvent::Requested {
//!         key: "temperatureTopic".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Narration requested");
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Narration Events
//! - `Requested`: `speak` was called for a key
//! - `Started`: a clip began playing
//! - `Completed`: a clip played to its natural end
//! - `Cancelled`: playback or a pending request was cancelled
//! - `Superseded`: a pending request lost to a newer one before playing
//! - `Failed`: the clip could not be loaded or played
//!
//! ### Output Events
//! - `Resumed`: a suspended output device was resumed
//! - `Unavailable`: the output device failed; narration is text-only
//!
//! ### Progress Events
//! - `TopicVisited`: a topic popup was opened
//! - `TopicUnlocked`: a topic became available
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: all senders were dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Narration request and session lifecycle
    Narration(NarrationEvent),
    /// Audio output device state
    Output(OutputEvent),
    /// Topic exploration progress
    Progress(ProgressEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Narration(e) => e.description(),
            CoreEvent::Output(e) => e.description(),
            CoreEvent::Progress(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Narration(NarrationEvent::Failed {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Output(OutputEvent::Unavailable { .. }) => EventSeverity::Error,
            CoreEvent::Narration(NarrationEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Narration(NarrationEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Progress(ProgressEvent::TopicUnlocked { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Narration Events
// ============================================================================

/// Events describing narration requests and playback sessions.
///
/// Keys are the catalog identifiers (`"temperatureTopic"`, `"quizWrong"`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NarrationEvent {
    /// `speak` was called.
    Requested {
        /// Catalog key requested.
        key: String,
    },
    /// A clip started playing.
    Started {
        /// Catalog key being narrated.
        key: String,
        /// Playback session identifier.
        session_id: String,
        /// Clip length (milliseconds).
        duration_ms: u64,
    },
    /// A clip played to its natural end.
    Completed {
        /// Catalog key that finished.
        key: String,
        /// Playback session identifier.
        session_id: String,
    },
    /// Narration was cancelled by the caller.
    Cancelled {
        /// Key that was playing or pending, if any.
        key: Option<String>,
    },
    /// A request was overtaken by a newer one before it could play.
    Superseded {
        /// Key of the abandoned request.
        key: String,
    },
    /// The clip could not be loaded or played.
    Failed {
        /// Catalog key that failed.
        key: String,
        /// Failure category (`asset_unavailable`, `load_failure`, `playback_environment`).
        kind: String,
        /// Human-readable error message.
        message: String,
        /// Whether a later request for the same key may succeed.
        recoverable: bool,
    },
}

impl NarrationEvent {
    fn description(&self) -> &str {
        match self {
            NarrationEvent::Requested { .. } => "Narration requested",
            NarrationEvent::Started { .. } => "Narration started",
            NarrationEvent::Completed { .. } => "Narration completed",
            NarrationEvent::Cancelled { .. } => "Narration cancelled",
            NarrationEvent::Superseded { .. } => "Narration request superseded",
            NarrationEvent::Failed { .. } => "Narration failed",
        }
    }
}

// ============================================================================
// Output Events
// ============================================================================

/// Events describing the host audio output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum OutputEvent {
    /// A suspended output was resumed.
    Resumed,
    /// The output failed; narration continues as text only.
    Unavailable {
        /// Reason reported by the host.
        message: String,
    },
}

impl OutputEvent {
    fn description(&self) -> &str {
        match self {
            OutputEvent::Resumed => "Audio output resumed",
            OutputEvent::Unavailable { .. } => "Audio output unavailable",
        }
    }
}

// ============================================================================
// Progress Events
// ============================================================================

/// Events describing how far the visitor has explored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ProgressEvent {
    /// A topic was opened.
    TopicVisited {
        /// Topic identifier.
        topic: String,
    },
    /// A topic became available for the first time.
    TopicUnlocked {
        /// Topic identifier.
        topic: String,
    },
}

impl ProgressEvent {
    fn description(&self) -> &str {
        match self {
            ProgressEvent::TopicVisited { .. } => "Topic visited",
            ProgressEvent::TopicUnlocked { .. } => "Topic unlocked",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber falling behind by more than `capacity` events receives
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none. Publishers in the core ignore that error.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let problems = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
