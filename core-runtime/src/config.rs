//! # Core Configuration Module
//!
//! Provides configuration management for the narration core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the host bridges and runtime settings. It enforces fail-fast
//! validation so a missing capability is reported at startup rather than on
//! the first `speak`.
//!
//! ## Required Dependencies
//!
//! - `AssetFetcher` - Loads narration clips (desktop default: tokio fs + reqwest)
//! - `AudioOutput` - Plays decoded PCM (desktop default: rodio)
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - Mirrors structured logs into the host pipeline
//!
//! When the `desktop-shims` feature is enabled, desktop defaults for both
//! required bridges are injected automatically if not provided. The default
//! fetcher resolves relative sources against `asset_root`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .asset_root("./site")
//!     .build()?;
//! ```
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .asset_fetcher(Arc::new(MyFetcher))
//!     .audio_output(Arc::new(MyOutput))
//!     .event_buffer_size(256)
//!     .enable_preload(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AssetFetcher, AudioOutput, LoggerSink};
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for the event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the narration core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory relative asset sources are resolved against, when known
    pub asset_root: Option<PathBuf>,

    /// Loads narration clips (required)
    pub asset_fetcher: Arc<dyn AssetFetcher>,

    /// Plays decoded clips (required)
    pub audio_output: Arc<dyn AudioOutput>,

    /// Host log pipeline (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("asset_root", &self.asset_root)
            .field("asset_fetcher", &"AssetFetcher { ... }")
            .field("audio_output", &"AudioOutput { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Decode every recorded clip at startup instead of on first request
    pub enable_preload: bool,

    /// Keep publishing transcripts as captions when audio is unavailable
    pub enable_text_fallback: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_preload: false,
            enable_text_fallback: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The asset root, when set, is not empty
    /// - The event buffer is non-zero and bounded
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.asset_root {
            if root.as_os_str().is_empty() {
                return Err(Error::Config("Asset root cannot be empty".to_string()));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn asset_fetcher_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AssetFetcher".to_string(),
        message: "AssetFetcher implementation is required to load narration clips. \
                 Desktop: enable the 'desktop-shims' feature and set .asset_root(). \
                 Other hosts: inject a fetcher backed by the platform's asset loader."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: "AudioOutput implementation is required to play narration. \
                 Desktop: enable the 'desktop-shims' feature to use the default RodioAudioOutput. \
                 Other hosts: inject the platform audio engine."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_asset_fetcher(asset_root: Option<&PathBuf>) -> Result<Arc<dyn AssetFetcher>> {
    use bridge_desktop::DesktopAssetFetcher;

    let root = asset_root.ok_or_else(|| {
        Error::Config(
            "Asset root is required for the default AssetFetcher. Use .asset_root() to set it."
                .to_string(),
        )
    })?;

    let fetcher = DesktopAssetFetcher::new(root.clone()).map_err(|e| {
        Error::Internal(format!("Failed to initialize default AssetFetcher: {}", e))
    })?;
    let fetcher: Arc<dyn AssetFetcher> = Arc::new(fetcher);
    Ok(fetcher)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_asset_fetcher(_asset_root: Option<&PathBuf>) -> Result<Arc<dyn AssetFetcher>> {
    Err(asset_fetcher_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutput>> {
    use bridge_desktop::RodioAudioOutput;

    // A missing device is not a configuration error: the output reports
    // itself closed and narration degrades to text.
    let output: Arc<dyn AudioOutput> = Arc::new(RodioAudioOutput::new());
    Ok(output)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutput>> {
    Err(audio_output_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    asset_root: Option<PathBuf>,
    asset_fetcher: Option<Arc<dyn AssetFetcher>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the directory relative asset sources are resolved against.
    pub fn asset_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.asset_root = Some(path.into());
        self
    }

    /// Sets the asset fetcher bridge.
    pub fn asset_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.asset_fetcher = Some(fetcher);
        self
    }

    /// Sets the audio output bridge.
    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    /// Sets the host logger sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the event bus buffer size (default 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Decode every recorded clip at startup.
    pub fn enable_preload(mut self, enabled: bool) -> Self {
        self.features.enable_preload = enabled;
        self
    }

    /// Publish transcripts as captions when audio is unavailable.
    pub fn enable_text_fallback(mut self, enabled: bool) -> Self {
        self.features.enable_text_fallback = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the configuration, injecting platform defaults where allowed.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   default is available
    /// - [`Error::Config`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let asset_fetcher = match self.asset_fetcher {
            Some(fetcher) => fetcher,
            None => provide_default_asset_fetcher(self.asset_root.as_ref())?,
        };

        let audio_output = match self.audio_output {
            Some(output) => output,
            None => provide_default_audio_output()?,
        };

        let config = CoreConfig {
            asset_root: self.asset_root,
            asset_fetcher,
            audio_output,
            logger_sink: self.logger_sink,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
