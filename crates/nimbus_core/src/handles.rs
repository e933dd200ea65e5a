//! Opaque handles.
//!
//! The pipeline never owns GPU objects. It refers to them through these
//! copyable identifiers, which are minted by the host (color targets, shader
//! programs, textures) or by the backend (scratch buffers).

use serde::{Deserialize, Serialize};

/// Host-owned camera color target. Read at the start of a frame and
/// overwritten with the composited image at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorTarget(pub u64);

/// Shader program known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Host-owned texture asset (noise volumes, weather maps). Settings files
/// refer to textures by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub u64);

/// Backend-owned, frame-scoped scratch buffer.
///
/// Valid only between acquisition and the end of the frame that acquired it.
/// Using a handle after release is a usage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScratchHandle(u64);

impl ScratchHandle {
    /// Wraps a backend-specific raw key.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}
