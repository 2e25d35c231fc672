//! Bounded event hand-off between proxy producers and the UI poller

mod buffer;

pub use buffer::{CaptureBuffer, DEFAULT_CAPACITY};
