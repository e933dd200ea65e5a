//! Developer utilities for Nimbus tests and demo apps.
//!
//! Not published; nothing in the runtime crates depends on this crate.

pub mod recording;

pub use recording::{Command, RecordingBackend};
