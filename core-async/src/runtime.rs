//! Runtime utilities that abstract over the underlying async executor.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Drive `future` to completion on the current thread.
///
/// Used where no Tokio runtime is reachable (for example a tracing layer
/// invoked from a plain OS thread). Must not be called from within an async
/// task.
pub use futures::executor::block_on;
