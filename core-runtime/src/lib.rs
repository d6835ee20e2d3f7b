//! # Core Runtime
//!
//! Shared plumbing for the narration crates:
//! - [`config`]: `CoreConfig` and its builder, which inject host bridges and
//!   fall back to desktop adapters under the `desktop-shims` feature
//! - [`events`]: the broadcast [`EventBus`](events::EventBus) and the
//!   `CoreEvent` hierarchy
//! - [`logging`]: `tracing-subscriber` setup and host log forwarding
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_runtime::events::EventBus;
//!
//! let config = CoreConfig::builder().asset_root("./site").build()?;
//! let events = EventBus::new(config.event_buffer_size);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
