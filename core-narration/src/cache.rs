//! # Audio Buffer Cache
//!
//! Fetches and decodes each recorded clip once, then serves the decoded
//! buffer from memory for the rest of the session. Entries are never evicted:
//! the catalog is small and fixed.
//!
//! Concurrent misses for the same key are not de-duplicated. Each performs its
//! own fetch and decode and the last one to finish overwrites the entry with
//! an equivalent buffer. Readers only ever see complete buffers.

use crate::config::NarrationConfig;
use crate::decoder::{extension_hint, ClipDecoder};
use crate::error::{NarrationError, Result};
use crate::registry::{AssetSource, AudioKey, Catalog};
use bridge_traits::{AssetFetcher, PcmClip};
use core_async::task::spawn_blocking;
use core_async::time::{timeout, Duration};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A decoded clip, ready to hand to the playback controller.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    key: AudioKey,
    clip: PcmClip,
}

impl DecodedBuffer {
    pub fn new(key: AudioKey, clip: PcmClip) -> Self {
        Self { key, clip }
    }

    pub fn key(&self) -> AudioKey {
        self.key
    }

    pub fn clip(&self) -> &PcmClip {
        &self.clip
    }

    pub fn duration(&self) -> Duration {
        self.clip.duration()
    }
}

/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Buffers currently held.
    pub entries: usize,
    /// Requests served from memory.
    pub hits: u64,
    /// Requests that had to load (or were rejected as unavailable).
    pub misses: u64,
    /// Fetches issued to the host.
    pub fetches: u64,
    /// Fetches or decodes that failed.
    pub failures: u64,
}

impl CacheStats {
    /// Fraction of requests served from memory, in `[0.0, 1.0]`.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Outcome of [`BufferCache::preload`].
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub loaded: Vec<AudioKey>,
    pub failed: Vec<(AudioKey, NarrationError)>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
}

/// Process-wide, append-only store of decoded narration.
pub struct BufferCache {
    catalog: Arc<Catalog>,
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn ClipDecoder>,
    entries: RwLock<HashMap<AudioKey, Arc<DecodedBuffer>>>,
    counters: Counters,
    fetch_timeout: Option<Duration>,
    decode_on_blocking_pool: bool,
}

impl BufferCache {
    pub fn new(
        catalog: Arc<Catalog>,
        fetcher: Arc<dyn AssetFetcher>,
        decoder: Arc<dyn ClipDecoder>,
    ) -> Self {
        let defaults = NarrationConfig::default();
        Self {
            catalog,
            fetcher,
            decoder,
            entries: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            fetch_timeout: defaults.fetch_timeout,
            decode_on_blocking_pool: defaults.decode_on_blocking_pool,
        }
    }

    /// Apply the load-related settings from `config`.
    pub fn with_config(mut self, config: &NarrationConfig) -> Self {
        self.fetch_timeout = config.fetch_timeout;
        self.decode_on_blocking_pool = config.decode_on_blocking_pool;
        self
    }

    /// Return the decoded buffer for `key`, loading it on first use.
    ///
    /// # Errors
    ///
    /// - [`NarrationError::AssetUnavailable`] for placeholder or unknown keys
    /// - [`NarrationError::LoadFailure`] if the fetch or decode fails; the
    ///   entry stays absent so the next call retries
    #[instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: AudioKey) -> Result<Arc<DecodedBuffer>> {
        let cached = self.entries.read().get(&key).cloned();
        if let Some(buffer) = cached {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit");
            return Ok(buffer);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let source = match self.catalog.get(key).map(|asset| &asset.source) {
            Some(AssetSource::File(path)) => path.clone(),
            Some(AssetSource::Placeholder) | None => {
                warn!("Narration asset is a placeholder or missing");
                return Err(NarrationError::AssetUnavailable { key });
            }
        };

        match self.load(key, &source).await {
            Ok(clip) => {
                let buffer = Arc::new(DecodedBuffer::new(key, clip));
                self.entries.write().insert(key, Arc::clone(&buffer));
                info!(
                    duration_ms = buffer.duration().as_millis() as u64,
                    "Narration buffer cached"
                );
                Ok(buffer)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Failed to load narration");
                Err(e)
            }
        }
    }

    async fn load(&self, key: AudioKey, source: &str) -> Result<PcmClip> {
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(source = %source, "Fetching narration clip");

        let fetched = match self.fetch_timeout {
            Some(limit) => timeout(limit, self.fetcher.fetch(source))
                .await
                .map_err(|_| {
                    NarrationError::load_failure(key, format!("fetch timed out after {:?}", limit))
                })?,
            None => self.fetcher.fetch(source).await,
        };
        let bytes = fetched.map_err(|e| NarrationError::load_failure(key, e))?;

        let extension = extension_hint(source).map(str::to_owned);
        let decoded = if self.decode_on_blocking_pool {
            let decoder = Arc::clone(&self.decoder);
            spawn_blocking(move || decoder.decode(bytes, extension.as_deref()))
                .await
                .map_err(|e| NarrationError::load_failure(key, e))?
        } else {
            self.decoder.decode(bytes, extension.as_deref())
        };

        let clip = decoded.map_err(|e| NarrationError::load_failure(key, e))?;
        if clip.is_empty() {
            return Err(NarrationError::load_failure(key, "decoded clip is empty"));
        }
        Ok(clip)
    }

    /// Load every key in `keys` that is not cached yet, one after another.
    pub async fn preload(&self, keys: impl IntoIterator<Item = AudioKey>) -> PreloadReport {
        let mut report = PreloadReport::default();
        for key in keys {
            match self.get(key).await {
                Ok(_) => report.loaded.push(key),
                Err(e) => report.failed.push((key, e)),
            }
        }
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Narration preload finished"
        );
        report
    }

    pub fn contains(&self, key: AudioKey) -> bool {
        self.entries.read().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NarrationAsset;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use mockall::mock;

    mock! {
        pub Fetcher {}

        #[async_trait]
        impl AssetFetcher for Fetcher {
            async fn fetch(&self, source: &str) -> BridgeResult<Bytes>;
        }
    }

    /// One frame per input byte, mono at 10 Hz.
    struct ByteDecoder;

    impl ClipDecoder for ByteDecoder {
        fn decode(&self, bytes: Bytes, _extension: Option<&str>) -> Result<PcmClip> {
            if bytes.is_empty() {
                return Err(NarrationError::InvalidFormat("empty".into()));
            }
            let samples: Vec<f32> = bytes.iter().map(|b| *b as f32 / 255.0).collect();
            Ok(PcmClip::new(samples, 10, 1))
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new()
                .with_asset(NarrationAsset::recorded(
                    AudioKey::MainScreenWelcome,
                    "./public/audio-1.wav",
                    "Olá!",
                ))
                .with_asset(NarrationAsset::placeholder(AudioKey::Credits, "Até logo!")),
        )
    }

    fn cache(fetcher: MockFetcher) -> BufferCache {
        BufferCache::new(catalog(), Arc::new(fetcher), Arc::new(ByteDecoder))
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_memory() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|source| source.ends_with("audio-1.wav"))
            .times(1)
            .returning(|_| Ok(Bytes::from_static(&[255; 20])));
        let cache = cache(fetcher);

        let first = cache.get(AudioKey::MainScreenWelcome).await.unwrap();
        let second = cache.get(AudioKey::MainScreenWelcome).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.duration(), Duration::from_secs(2));
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1,
                fetches: 1,
                failures: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_placeholder_is_unavailable_without_fetching() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().never();
        let cache = cache(fetcher);

        let err = cache.get(AudioKey::Credits).await.unwrap_err();
        assert_eq!(err, NarrationError::AssetUnavailable { key: AudioKey::Credits });

        let err = cache.get(AudioKey::QuizWrong).await.unwrap_err();
        assert_eq!(err, NarrationError::AssetUnavailable { key: AudioKey::QuizWrong });
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let mut fetcher = MockFetcher::new();
        let mut seq = mockall::Sequence::new();
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|source| Err(BridgeError::NotFound(source.to_string())));
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Bytes::from_static(&[128; 10])));
        let cache = cache(fetcher);

        let err = cache.get(AudioKey::MainScreenWelcome).await.unwrap_err();
        assert!(err.is_transient());
        assert!(!cache.contains(AudioKey::MainScreenWelcome));

        cache.get(AudioKey::MainScreenWelcome).await.unwrap();
        assert!(cache.contains(AudioKey::MainScreenWelcome));
        assert_eq!(cache.stats().failures, 1);
        assert_eq!(cache.stats().fetches, 2);
    }

    #[tokio::test]
    async fn test_decode_failure_reports_load_failure() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(Bytes::new()));
        let cache = cache(fetcher);

        let err = cache.get(AudioKey::MainScreenWelcome).await.unwrap_err();
        assert!(matches!(
            err,
            NarrationError::LoadFailure { key: AudioKey::MainScreenWelcome, ref cause }
                if cause.contains("empty")
        ));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_inline_decoding() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(Bytes::from_static(&[1; 5])));
        let config = NarrationConfig {
            decode_on_blocking_pool: false,
            ..Default::default()
        };
        let cache = cache(fetcher).with_config(&config);

        let buffer = cache.get(AudioKey::MainScreenWelcome).await.unwrap();
        assert_eq!(buffer.clip().frames(), 5);
        assert_eq!(buffer.key(), AudioKey::MainScreenWelcome);
    }

    #[tokio::test]
    async fn test_preload_reports_each_key() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(Bytes::from_static(&[9; 30])));
        let cache = cache(fetcher);

        let report = cache
            .preload([AudioKey::MainScreenWelcome, AudioKey::Credits])
            .await;

        assert_eq!(report.loaded, vec![AudioKey::MainScreenWelcome]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, AudioKey::Credits);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_hit_ratio() {
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
