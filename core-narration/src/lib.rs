//! # Narration Core
//!
//! Loads, caches and plays the sun's pre-recorded narration, one clip at a
//! time, and keeps captions in step with playback.
//!
//! ## Components
//!
//! - [`Catalog`]: static key → audio source, transcript and word timings
//! - [`BufferCache`]: fetch + decode once per key, then serve from memory
//! - [`PlaybackController`]: single live [`PlaybackSession`] on the host output
//! - [`NarrationService`]: `speak` / `cancel` / `clear_narration` and the
//!   published [`NarrationState`]
//! - [`CaptionView`]: which words are revealed and which one is active
//!
//! ## Example
//!
//! ```rust,ignore
//! use core_narration::{AudioKey, Catalog, NarrationService, SpeakOutcome};
//! use std::sync::Arc;
//!
//! let narrator = NarrationService::builder(Arc::new(Catalog::builtin()))
//!     .fetcher(fetcher)
//!     .output(output)
//!     .build()?;
//!
//! let mut state = narrator.subscribe();
//! if let SpeakOutcome::Started(_) = narrator.speak(AudioKey::MainScreenWelcome).await {
//!     while state.changed().await.is_ok() {
//!         let snapshot = state.borrow_and_update().clone();
//!         println!("{}", snapshot.caption().text());
//!         if !snapshot.is_speaking {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod cache;
pub mod captions;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod registry;
pub mod service;
pub mod state;
pub mod topics;

pub use cache::{BufferCache, CacheStats, DecodedBuffer, PreloadReport};
pub use captions::{Caption, CaptionView};
pub use config::NarrationConfig;
pub use controller::{PlaybackController, PlaybackSession, SessionId};
pub use decoder::ClipDecoder;
#[cfg(feature = "symphonia-decoder")]
pub use decoder::SymphoniaClipDecoder;
pub use error::{NarrationError, Result};
pub use registry::{AssetSource, AudioKey, Catalog, NarrationAsset, WordTiming};
pub use service::{NarrationService, NarrationServiceBuilder, SpeakOutcome};
pub use state::NarrationState;
pub use topics::{QuizNarration, Topic, TopicContent, TopicProgress};
