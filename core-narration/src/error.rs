//! # Narration Error Types
//!
//! Every failure the narration core can report. None of them is fatal to the
//! host: [`NarrationService`](crate::NarrationService) recovers all of them at
//! its boundary and turns them into a [`SpeakOutcome`](crate::SpeakOutcome).

use crate::registry::AudioKey;
use thiserror::Error;

/// Errors that can occur while loading or playing narration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NarrationError {
    // ========================================================================
    // Catalog Errors
    // ========================================================================
    /// The key has no recorded audio (placeholder entry or missing from the catalog).
    #[error("Narration asset unavailable: {key}")]
    AssetUnavailable { key: AudioKey },

    /// A string did not name any catalog key.
    #[error("Unknown narration key: {0}")]
    UnknownKey(String),

    // ========================================================================
    // Load Errors
    // ========================================================================
    /// Fetching or decoding a recorded clip failed. Nothing is cached, so a
    /// later request retries.
    #[error("Failed to load narration {key}: {cause}")]
    LoadFailure { key: AudioKey, cause: String },

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// The bytes are not a recognizable audio container.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// The container holds no track with a codec we can decode.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The stream was recognized but decoding it failed.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// The audio output could not be resumed or started.
    #[error("Playback environment failure: {0}")]
    PlaybackEnvironmentFailure(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid narration configuration: {0}")]
    InvalidConfig(String),
}

impl NarrationError {
    /// Wrap any fetch or decode error as a [`NarrationError::LoadFailure`] for `key`.
    pub fn load_failure(key: AudioKey, cause: impl std::fmt::Display) -> Self {
        NarrationError::LoadFailure {
            key,
            cause: cause.to_string(),
        }
    }

    /// Returns true if a later request for the same key may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, NarrationError::LoadFailure { .. })
    }

    /// Returns true if the error means no narration can be heard for the rest
    /// of the session.
    pub fn is_environment_failure(&self) -> bool {
        matches!(self, NarrationError::PlaybackEnvironmentFailure(_))
    }

    /// Stable category name used in events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NarrationError::AssetUnavailable { .. } | NarrationError::UnknownKey(_) => {
                "asset_unavailable"
            }
            NarrationError::LoadFailure { .. }
            | NarrationError::InvalidFormat(_)
            | NarrationError::UnsupportedCodec(_)
            | NarrationError::DecodingError(_) => "load_failure",
            NarrationError::PlaybackEnvironmentFailure(_) => "playback_environment",
            NarrationError::InvalidConfig(_) => "config",
        }
    }
}

/// Result type for narration operations.
pub type Result<T> = std::result::Result<T, NarrationError>;
