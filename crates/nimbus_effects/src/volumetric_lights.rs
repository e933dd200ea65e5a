//! Raymarched Volumetric Lights
//!
//! Screen-space light shafts: the main light is raymarched through the depth
//! buffer at reduced resolution, blurred with a separable bilateral kernel,
//! and composited over the scene at native resolution using a downsampled
//! copy of the depth buffer.
//!
//! The effect uses the canonical topology selected by
//! [`VolumetricLightSettings::stage`]; see [`nimbus_render::graph::topology`].
//! In the `Full` topology the blurred result is published as
//! `_volumetricTexture` and the low-resolution depth as `_LowResDepth`.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use nimbus_core::{Result, SharedSettings};
use nimbus_render::{
    CanonicalPasses, DebugStage, EffectSettings, InjectionPoint, StageGraph, UniformName,
    uniform_table, volumetric_graph,
};

use crate::feature::EffectFeature;

// ─── Uniforms ─────────────────────────────────────────────────────────────────

pub const SCATTERING: UniformName = UniformName::new("_Scattering");
pub const STEPS: UniformName = UniformName::new("_Steps");
pub const JITTER: UniformName = UniformName::new("_JitterVolumetric");
pub const MAX_DISTANCE: UniformName = UniformName::new("_MaxDistance");
pub const INTENSITY: UniformName = UniformName::new("_Intensity");
pub const GAUSS_SAMPLES: UniformName = UniformName::new("_GaussSamples");
pub const GAUSS_AMOUNT: UniformName = UniformName::new("_GaussAmount");
pub const TINT: UniformName = UniformName::new("_Tint");

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Bilateral blur parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussBlur {
    /// Kernel spread.
    pub amount: f32,
    /// Taps per axis.
    pub samples: f32,
}

/// Volumetric light configuration.
///
/// # Example
///
/// ```rust,ignore
/// let settings = SharedSettings::new(VolumetricLightSettings {
///     downsampling: 2,
///     intensity: 1.5,
///     ..Default::default()
/// });
/// stack.add(Box::new(volumetric_lights::feature(settings, Some(program))));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumetricLightSettings {
    /// Downsample factor for the raymarch and blur buffers: `1`, `2`, `3`
    /// or `4`. Any other value keeps the effect unconfigured.
    ///
    /// Default: `1`
    pub downsampling: i32,

    /// Debug stage selector.
    ///
    /// Default: [`DebugStage::Full`]
    pub stage: DebugStage,

    /// Light color multiplier (RGBA).
    ///
    /// Default: white
    pub tint: Vec4,

    /// Default: `1.0`
    pub intensity: f32,

    /// Mie scattering anisotropy.
    ///
    /// Default: `0.0`
    pub scattering: f32,

    /// Raymarch steps per pixel.
    ///
    /// Default: `24`
    pub steps: f32,

    /// Raymarch distance cap in world units.
    ///
    /// Default: `75`
    pub max_distance: f32,

    /// Per-pixel start offset noise strength.
    ///
    /// Default: `250`
    pub jitter: f32,

    pub gauss_blur: GaussBlur,

    /// Default: [`InjectionPoint::AfterPostProcessing`]
    pub injection: InjectionPoint,
}

impl Default for VolumetricLightSettings {
    fn default() -> Self {
        Self {
            downsampling: 1,
            stage: DebugStage::Full,
            tint: Vec4::ONE,
            intensity: 1.0,
            scattering: 0.0,
            steps: 24.0,
            max_distance: 75.0,
            jitter: 250.0,
            gauss_blur: GaussBlur::default(),
            injection: InjectionPoint::AfterPostProcessing,
        }
    }
}

uniform_table! {
    VolumetricLightSettings => |s| {
        SCATTERING => s.scattering,
        STEPS => s.steps,
        JITTER => s.jitter,
        MAX_DISTANCE => s.max_distance,
        INTENSITY => s.intensity,
        GAUSS_SAMPLES => s.gauss_blur.samples,
        GAUSS_AMOUNT => s.gauss_blur.amount,
        TINT => s.tint,
    }
}

impl EffectSettings for VolumetricLightSettings {
    type GraphKey = DebugStage;

    fn downsample_factor(&self) -> i32 {
        self.downsampling
    }

    fn graph_key(&self) -> DebugStage {
        self.stage
    }

    fn build_graph(&self) -> Result<StageGraph> {
        volumetric_graph(self.stage, CanonicalPasses::default())
    }
}

/// Feature name used in logs and errors.
pub const NAME: &str = "Volumetric Light";

/// Creates the host feature. The injection point is read from the settings
/// once, here.
#[must_use]
pub fn feature(
    settings: SharedSettings<VolumetricLightSettings>,
    program: Option<nimbus_core::ProgramId>,
) -> EffectFeature<VolumetricLightSettings> {
    let injection = settings.snapshot().injection;
    EffectFeature::new(NAME, settings, injection).with_program(program)
}
