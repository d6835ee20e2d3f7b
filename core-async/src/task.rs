//! Task spawning.
//!
//! Spawned futures must be `Send + 'static`. CPU-bound work (decoding a clip
//! into PCM) goes through [`spawn_blocking`] so frame ticks keep flowing.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let pcm_len = task::spawn_blocking(|| vec![0.0f32; 1024].len())
//!         .await
//!         .unwrap_or_default();
//!     assert_eq!(pcm_len, 1024);
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the Tokio runtime.
///
/// The spawned task may run on a different thread. The returned handle can be
/// awaited for the task's output or used to abort it.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
