//! Error Types
//!
//! This module defines the error types used throughout the pipeline.
//!
//! # Overview
//!
//! Errors fall into two families that callers handle differently:
//!
//! - **Configuration errors** ([`NimbusError::InvalidConfiguration`],
//!   [`NimbusError::Settings`], [`NimbusError::Io`]): the pipeline cannot run
//!   with the current inputs. Frames are skipped until the inputs are fixed.
//! - **Execution errors** ([`NimbusError::StageExecution`],
//!   [`NimbusError::Backend`]): the backend rejected work during a frame. The
//!   frame is abandoned, resources are released, and the next frame starts
//!   fresh.
//!
//! Use [`NimbusError::is_configuration`] to tell them apart.

use thiserror::Error;

use crate::handles::{ProgramId, ScratchHandle};

/// Errors reported by a render backend.
///
/// Backends are external collaborators; these variants describe the
/// rejections the pipeline knows how to attribute to a stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The referenced shader program is unknown to the backend.
    #[error("unknown shader program {0:?}")]
    UnknownProgram(ProgramId),

    /// The shader program has no pass with the requested index.
    #[error("shader program {program:?} has no pass {pass} ({pass_count} passes available)")]
    InvalidPass {
        /// Program the blit was issued against
        program: ProgramId,
        /// Requested pass index
        pass: u32,
        /// Number of passes the program actually has
        pass_count: u32,
    },

    /// A scratch handle was used after it was released.
    #[error("scratch buffer {0:?} is not live")]
    StaleHandle(ScratchHandle),

    /// The backend could not allocate a scratch buffer.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Any other backend-specific rejection.
    #[error("backend rejected command: {0}")]
    Rejected(String),
}

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum NimbusError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Non-positive dimensions, an out-of-range downsample factor, a missing
    /// shader program or a malformed stage graph.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),

    /// File I/O error while loading settings.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// A stage's blit was rejected by the backend.
    #[error("{feature}: stage '{stage}' (pass {pass:?}) failed: {source}")]
    StageExecution {
        /// Feature whose graph was executing
        feature: String,
        /// Name of the failing stage
        stage: &'static str,
        /// Shader pass index of the failing stage (`None` for plain copies)
        pass: Option<u32>,
        /// The backend's reason
        #[source]
        source: BackendError,
    },

    /// A backend call outside of a stage failed (acquisition, uniform upload).
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl NimbusError {
    /// Shorthand for building an [`InvalidConfiguration`](Self::InvalidConfiguration) error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Returns `true` for errors that keep the pipeline from running until
    /// its inputs change.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::Settings(_) | Self::Io(_)
        )
    }
}

/// Alias for `Result<T, NimbusError>`.
pub type Result<T> = std::result::Result<T, NimbusError>;
