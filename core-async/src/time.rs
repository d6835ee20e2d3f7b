//! Time-related abstractions.
//!
//! [`Instant`] is Tokio's instant so that elapsed playback time follows the
//! runtime clock. Under a paused test runtime (`start_paused = true`) time
//! only moves when the test advances it, which keeps caption timing tests
//! deterministic.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{interval, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     let mut frames = interval(Duration::from_millis(16));
//!     frames.tick().await;
//!     frames.tick().await;
//!     println!("two frames took {:?}", start.elapsed());
//! }
//! ```

pub use std::time::Duration;
pub use tokio::time::{
    error::Elapsed, interval, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior,
    Sleep, Timeout,
};
