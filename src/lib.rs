//! Workspace umbrella crate.
//!
//! Re-exports [`core_service`] behind the `desktop-shims` feature so host
//! applications can depend on `narrator-workspace` without wiring each crate
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
