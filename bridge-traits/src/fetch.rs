//! Asset fetching bridge.
//!
//! Narration clips are opaque binary resources. The core never touches the
//! filesystem or network itself; it asks the host to resolve a source
//! reference (a relative asset path or an absolute `http(s)` URL) into bytes.

use bytes::Bytes;

use crate::{error::Result, platform::PlatformSendSync};

/// Loads raw asset bytes by source reference.
///
/// Implementations should map a missing resource to
/// [`BridgeError::NotFound`](crate::BridgeError::NotFound) and transport or
/// filesystem problems to `Io`/`OperationFailed`. The core treats every error
/// as a load failure for that asset and will retry on the next request.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::fetch::AssetFetcher;
///
/// async fn clip_size(fetcher: &dyn AssetFetcher) -> usize {
///     fetcher.fetch("audio/audio-1.wav").await.map(|b| b.len()).unwrap_or(0)
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AssetFetcher: PlatformSendSync {
    /// Resolve `source` and return its full contents.
    async fn fetch(&self, source: &str) -> Result<Bytes>;
}
