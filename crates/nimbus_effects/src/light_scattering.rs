//! Radial-Blur Light Scattering
//!
//! Classic "god rays": occluders are drawn into a reduced-resolution mask,
//! which is then radially blurred towards the sun's screen position and
//! added over the camera target.
//!
//! # Graph
//!
//! ```text
//! source ─0─► occluders (round(native * resolution_scale)) ─1─► source
//! ```
//!
//! The mask resolution follows [`LightScatteringSettings::resolution_scale`]
//! rather than a downsample factor.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use nimbus_core::{ProgramId, Result, SharedSettings};
use nimbus_render::{
    BufferSlot, EffectSettings, InjectionPoint, SlotId, SlotRef, Stage, StageGraph, UniformName,
    uniform_table,
};

use crate::feature::EffectFeature;

pub const CENTER: UniformName = UniformName::new("_Center");
pub const TINT: UniformName = UniformName::new("_Tint");
pub const SAMPLES: UniformName = UniformName::new("_Samples");
pub const INTENSITY: UniformName = UniformName::new("_Intensity");
pub const BLUR_WIDTH: UniformName = UniformName::new("_BlurWidth");

/// Radial blur quality. The shader reads the raw value as its sample-count
/// selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ScatteringQuality {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl ScatteringQuality {
    #[inline]
    #[must_use]
    pub fn samples(self) -> f32 {
        f32::from(self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightScatteringSettings {
    pub quality: ScatteringQuality,

    /// Default: white
    pub tint: Vec4,

    /// Occluder mask size relative to the camera target, in `[0.1, 1]`.
    ///
    /// Default: `0.5`
    pub resolution_scale: f32,

    /// Range `[0, 1]`.
    ///
    /// Default: `1.0`
    pub intensity: f32,

    /// Range `[0, 1]`.
    ///
    /// Default: `0.85`
    pub blur_width: f32,

    /// Sun position in viewport space (`[0, 1]²`, origin bottom-left).
    /// Updated by the host every frame, see [`sun_viewport_position`].
    ///
    /// Default: `(0.5, 0.5)`
    pub sun_viewport_position: Vec2,

    /// Default: [`InjectionPoint::BeforePostProcessing`]
    pub injection: InjectionPoint,
}

impl Default for LightScatteringSettings {
    fn default() -> Self {
        Self {
            quality: ScatteringQuality::Low,
            tint: Vec4::ONE,
            resolution_scale: 0.5,
            intensity: 1.0,
            blur_width: 0.85,
            sun_viewport_position: Vec2::splat(0.5),
            injection: InjectionPoint::BeforePostProcessing,
        }
    }
}

uniform_table! {
    LightScatteringSettings => |s| {
        CENTER => s.sun_viewport_position,
        TINT => s.tint,
        SAMPLES => s.quality.samples(),
        INTENSITY => s.intensity,
        BLUR_WIDTH => s.blur_width,
    }
}

/// Occluder mask buffer.
pub const OCCLUDERS: SlotId = SlotId(0);

pub const OCCLUDER_PASS: u32 = 0;
pub const RADIAL_BLUR_PASS: u32 = 1;

impl EffectSettings for LightScatteringSettings {
    // Bit pattern of the resolution scale.
    type GraphKey = u32;

    /// The mask is sized by `resolution_scale`, so the downsample factor is
    /// always off.
    fn downsample_factor(&self) -> i32 {
        1
    }

    fn graph_key(&self) -> u32 {
        self.resolution_scale.to_bits()
    }

    fn build_graph(&self) -> Result<StageGraph> {
        StageGraph::new(
            "LightScattering",
            vec![BufferSlot::fraction(
                OCCLUDERS,
                "occluders",
                self.resolution_scale,
            )],
            vec![
                Stage::blit(
                    "occluders",
                    SlotRef::Source,
                    SlotRef::Slot(OCCLUDERS),
                    OCCLUDER_PASS,
                ),
                Stage::blit(
                    "radial_blur",
                    SlotRef::Slot(OCCLUDERS),
                    SlotRef::Source,
                    RADIAL_BLUR_PASS,
                ),
            ],
        )
    }
}

/// Projects a point one unit along the sun direction from the camera into
/// viewport space.
///
/// `view_proj` is the camera's view-projection matrix and `sun_forward` the
/// direction the sun light travels.
#[must_use]
pub fn sun_viewport_position(view_proj: Mat4, camera_position: Vec3, sun_forward: Vec3) -> Vec2 {
    let ndc = view_proj.project_point3(camera_position + sun_forward);
    Vec2::new(ndc.x * 0.5 + 0.5, ndc.y * 0.5 + 0.5)
}

pub const NAME: &str = "Light Scattering";

/// Creates the host feature.
#[must_use]
pub fn feature(
    settings: SharedSettings<LightScatteringSettings>,
    program: Option<ProgramId>,
) -> EffectFeature<LightScatteringSettings> {
    let injection = settings.snapshot().injection;
    EffectFeature::new(NAME, settings, injection).with_program(program)
}
