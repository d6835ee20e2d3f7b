//! # Clip Decoding
//!
//! Turns the raw bytes of a narration file into interleaved PCM that the host
//! output can play. Clips are short, so they are decoded in one pass rather
//! than streamed.

#[cfg(feature = "symphonia-decoder")]
mod symphonia;

#[cfg(feature = "symphonia-decoder")]
pub use self::symphonia::SymphoniaClipDecoder;

use crate::error::Result;
use bridge_traits::platform::PlatformSendSync;
use bridge_traits::PcmClip;
use bytes::Bytes;
use std::path::Path;

/// Decodes a complete audio file into a [`PcmClip`].
///
/// Decoding is CPU-bound and synchronous; the cache runs it on the blocking
/// pool.
pub trait ClipDecoder: PlatformSendSync {
    /// Decode `bytes`. `extension` is the source file's extension, if any, and
    /// is only a hint for format probing.
    fn decode(&self, bytes: Bytes, extension: Option<&str>) -> Result<PcmClip>;
}

/// Extension of a source reference, used as a probe hint.
///
/// Query strings and fragments on URLs are ignored.
pub fn extension_hint(source: &str) -> Option<&str> {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}
