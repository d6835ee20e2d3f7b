//! Async filesystem helpers re-exported from the underlying runtime.

pub use tokio::fs::{metadata, read, read_to_string, File};
