//! # Narration Configuration

use crate::error::{NarrationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for [`NarrationService`](crate::NarrationService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// How often `current_time` is republished while a clip plays.
    ///
    /// Default: 16 ms (one frame at 60 Hz).
    #[serde(default = "default_frame_interval")]
    pub frame_interval: Duration,

    /// Maximum time to wait for the host to deliver a clip's bytes. `None`
    /// waits indefinitely.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: Option<Duration>,

    /// Resume a suspended output before starting a clip.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub resume_before_play: bool,

    /// Decode on the blocking thread pool instead of inline on the calling
    /// task.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub decode_on_blocking_pool: bool,

    /// Keep showing transcripts after the output has failed for good.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub text_fallback: bool,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            frame_interval: default_frame_interval(),
            fetch_timeout: default_fetch_timeout(),
            resume_before_play: true,
            decode_on_blocking_pool: true,
            text_fallback: true,
        }
    }
}

impl NarrationConfig {
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_text_fallback(mut self, enabled: bool) -> Self {
        self.text_fallback = enabled;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.frame_interval.is_zero() {
            return Err(NarrationError::InvalidConfig(
                "frame_interval must be > 0".to_string(),
            ));
        }

        if self.frame_interval > Duration::from_secs(1) {
            return Err(NarrationError::InvalidConfig(
                "frame_interval must be at most 1 second".to_string(),
            ));
        }

        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            return Err(NarrationError::InvalidConfig(
                "fetch_timeout must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_frame_interval() -> Duration {
    Duration::from_millis(16)
}

fn default_fetch_timeout() -> Option<Duration> {
    Some(Duration::from_secs(15))
}

fn default_true() -> bool {
    true
}
