//! Synchronization primitives.
//!
//! All primitives are `Send + Sync` and async-aware. The narration core
//! publishes state through [`watch`] channels, fans events out through
//! [`broadcast`], and stops background loops with a [`CancellationToken`].
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::watch;
//!
//! async fn example() {
//!     let (tx, mut rx) = watch::channel(0u32);
//!     tx.send_replace(1);
//!     rx.changed().await.ok();
//!     assert_eq!(*rx.borrow(), 1);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

pub use tokio_util::sync::CancellationToken;
