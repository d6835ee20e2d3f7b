//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - [`DesktopAssetFetcher`]: narration clips from an asset directory via
//!   `tokio::fs`, or from `http(s)` URLs via `reqwest`
//! - [`RodioAudioOutput`]: decoded PCM played through `rodio` on a dedicated
//!   audio thread
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopAssetFetcher, RodioAudioOutput};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let fetcher = DesktopAssetFetcher::new("public")?;
//!     let output = RodioAudioOutput::new();
//!
//!     // Hand both to the core configuration
//!     Ok(())
//! }
//! ```

mod fetcher;
mod output;

pub use fetcher::DesktopAssetFetcher;
pub use output::RodioAudioOutput;
