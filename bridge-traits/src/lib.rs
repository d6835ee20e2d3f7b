//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the
//! narration core.
//!
//! ## Overview
//!
//! The core decides *what* to say and *when*; the host decides *how* bytes are
//! loaded and *where* sound comes out. Each trait here represents one such
//! capability.
//!
//! ## Traits
//!
//! - [`AssetFetcher`](fetch::AssetFetcher) - Load narration clips by source reference
//! - [`AudioOutput`](playback::AudioOutput) - Play decoded PCM, report device state
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Web      | TBD                 | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let audio_output = config.audio_output
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "AudioOutput".to_string(),
//!         message: "No audio output provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Other hosts: inject a platform adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and include context such as the asset path.

pub mod error;
pub mod fetch;
pub mod log;
pub mod platform;
pub mod playback;

pub use error::BridgeError;

pub use fetch::AssetFetcher;
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioOutput, CompletionCallback, OutputState, PcmClip, VoiceId};
