//! Executor lifecycle states.
//!
//! ```text
//!                 configure ok
//! Unconfigured ───────────────► Validated
//!      ▲                            │ bind
//!      │ invalid program /          ▼
//!      │ invalid configuration    Bound ──► Executed ──► Released
//!      │                            ▲                       │
//!      └────────────────────────────┴──── next frame ───────┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    /// No valid program or downsample factor. Frames are no-ops.
    #[default]
    Unconfigured,
    /// Program and settings validated; no frame has started yet.
    Validated,
    /// Parameters bound for the current frame.
    Bound,
    /// Stages walked and commands submitted.
    Executed,
    /// Scratch released; ready for the next frame.
    Released,
}

impl PipelineState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::Validated => "Validated",
            Self::Bound => "Bound",
            Self::Executed => "Executed",
            Self::Released => "Released",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
