//! Render-target dimensions and downsample factors.
//!
//! Hosts hand the pipeline raw signed integers (camera pixel rects, serialized
//! enum values). Everything is validated here once so the rest of the pipeline
//! only ever sees positive dimensions and a factor from `{1, 2, 3, 4}`.

use std::fmt;

use crate::errors::{NimbusError, Result};

/// Validated, strictly positive 2D dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    /// Creates an extent from host-supplied signed dimensions.
    ///
    /// Fails with [`NimbusError::InvalidConfiguration`] when either
    /// dimension is zero or negative.
    pub fn from_signed(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(NimbusError::invalid_config(format!(
                "render target dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    /// Creates an extent from unsigned dimensions, rejecting zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(NimbusError::invalid_config(format!(
                "render target dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Integer division by the downsample factor (floor).
    ///
    /// The result may be zero for tiny targets; callers validate it.
    #[inline]
    #[must_use]
    pub const fn downsampled(self, factor: DownsampleFactor) -> (u32, u32) {
        let d = factor.divisor();
        (self.width / d, self.height / d)
    }

    /// Scales by a fraction, rounding to the nearest pixel.
    #[inline]
    #[must_use]
    pub fn scaled(self, fraction: f32) -> (u32, u32) {
        let w = (self.width as f32 * fraction).round().max(0.0) as u32;
        let h = (self.height as f32 * fraction).round().max(0.0) as u32;
        (w, h)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer divisor applied to the native resolution for intermediate buffers.
///
/// Only `1` (off), `2` (half), `3` (third) and `4` (quarter) are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum DownsampleFactor {
    #[default]
    Off = 1,
    Half = 2,
    Third = 3,
    Quarter = 4,
}

impl DownsampleFactor {
    /// All valid factors, in increasing order.
    pub const ALL: [Self; 4] = [Self::Off, Self::Half, Self::Third, Self::Quarter];

    /// Validates a raw host value.
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1 => Ok(Self::Off),
            2 => Ok(Self::Half),
            3 => Ok(Self::Third),
            4 => Ok(Self::Quarter),
            _ => Err(NimbusError::invalid_config(format!(
                "downsample factor must be one of 1, 2, 3, 4, got {raw}"
            ))),
        }
    }

    #[inline]
    #[must_use]
    pub const fn divisor(self) -> u32 {
        self as u32
    }
}

impl TryFrom<i32> for DownsampleFactor {
    type Error = NimbusError;

    fn try_from(raw: i32) -> Result<Self> {
        Self::from_raw(raw)
    }
}
