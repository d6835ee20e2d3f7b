//! Async runtime facade for the narration core.
//!
//! Every `core-*` and `bridge-*` crate depends on this crate instead of
//! reaching for Tokio directly, so the executor surface the narration
//! subsystem relies on lives in one place.
//!
//! # Modules
//!
//! - `task`: task spawning, including blocking work such as audio decoding
//! - `time`: frame intervals, sleeps and the monotonic [`Instant`]
//! - `sync`: channels, locks and the [`CancellationToken`](sync::CancellationToken)
//! - `fs`: async filesystem access used by the desktop asset fetcher
//! - `runtime`: runtime handles for code running outside async tasks
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(16)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.ok(), Some(42));
//! }
//! ```

pub mod fs;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
