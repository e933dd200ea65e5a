//! Buffer Slots
//!
//! A [`BufferSlot`] declares one intermediate buffer a stage graph needs:
//! its name, how its size derives from the camera resolution, and its pixel
//! format. Slots are declarations only; the [`ResourceAllocator`] turns them
//! into backend scratch buffers once per frame.
//!
//! [`ResourceAllocator`]: crate::allocator::ResourceAllocator

use nimbus_core::{DownsampleFactor, Extent, NimbusError, Result};

/// Default pixel format for intermediate buffers. Single-channel 8-bit
/// formats show visible banding in volumetric gradients.
pub const DEFAULT_SLOT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Index of a slot within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u16);

/// How a slot's dimensions relate to the native camera resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotScale {
    /// `floor(native / downsample_factor)`.
    Downsampled,
    /// Native resolution, regardless of the downsample factor. Used for the
    /// final composite.
    Native,
    /// `round(native * fraction)`, independent of the downsample factor.
    Fraction(f32),
}

/// Declaration of one intermediate buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSlot {
    pub id: SlotId,
    pub name: &'static str,
    pub scale: SlotScale,
    pub format: wgpu::TextureFormat,
}

impl BufferSlot {
    /// A buffer at the effect's downsampled resolution.
    #[must_use]
    pub const fn downsampled(id: SlotId, name: &'static str) -> Self {
        Self {
            id,
            name,
            scale: SlotScale::Downsampled,
            format: DEFAULT_SLOT_FORMAT,
        }
    }

    /// A buffer at native resolution.
    #[must_use]
    pub const fn native(id: SlotId, name: &'static str) -> Self {
        Self {
            id,
            name,
            scale: SlotScale::Native,
            format: DEFAULT_SLOT_FORMAT,
        }
    }

    /// A buffer at a fraction of native resolution.
    #[must_use]
    pub const fn fraction(id: SlotId, name: &'static str, fraction: f32) -> Self {
        Self {
            id,
            name,
            scale: SlotScale::Fraction(fraction),
            format: DEFAULT_SLOT_FORMAT,
        }
    }

    #[must_use]
    pub const fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Multisample count. Effects never resolve anti-aliasing, so this is
    /// always 1.
    #[inline]
    #[must_use]
    pub const fn sample_count(&self) -> u32 {
        1
    }

    #[inline]
    #[must_use]
    pub fn is_native_resolution(&self) -> bool {
        matches!(self.scale, SlotScale::Native)
    }

    /// Computes this slot's dimensions for a frame.
    ///
    /// Fails when the result would have a zero dimension (for example a
    /// 3-pixel-wide target at quarter resolution).
    pub fn resolve_extent(&self, native: Extent, factor: DownsampleFactor) -> Result<Extent> {
        let (width, height) = match self.scale {
            SlotScale::Native => return Ok(native),
            SlotScale::Downsampled => native.downsampled(factor),
            SlotScale::Fraction(f) => native.scaled(f),
        };
        Extent::new(width, height).map_err(|_| {
            NimbusError::invalid_config(format!(
                "slot '{}' resolves to {width}x{height} for native {native} at factor {}",
                self.name,
                factor.divisor()
            ))
        })
    }
}
