//! Volumetric Clouds
//!
//! Raymarches a box-shaped cloud container against 3D shape / detail noise
//! and a weather map, lit with a two-lobe phase function and optional
//! self-shadowing.
//!
//! # Graph
//!
//! ```text
//! source ─0─► clouds (downsampled) ─► (write back) source
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use nimbus_core::{ProgramId, Result, SharedSettings, TextureId};
use nimbus_render::{
    BufferSlot, EffectSettings, InjectionPoint, SlotId, SlotRef, Stage, StageGraph, UniformName,
    uniform_table,
};

use crate::feature::EffectFeature;
use crate::phase::PhaseParameters;

// ─── Uniforms ─────────────────────────────────────────────────────────────────

pub const BOUNDS_MIN: UniformName = UniformName::new("_BoundsMin");
pub const BOUNDS_MAX: UniformName = UniformName::new("_BoundsMax");
pub const SHAPE_NOISE: UniformName = UniformName::new("_ShapeNoise");
pub const DETAIL_NOISE: UniformName = UniformName::new("_DetailNoiseTex");
pub const WEATHER_MAP: UniformName = UniformName::new("_WeatherMap");
pub const SHAPE_OFFSET: UniformName = UniformName::new("_ShapeOffset");
pub const DETAIL_OFFSET: UniformName = UniformName::new("_DetailOffset");
pub const SHAPE_SCALE: UniformName = UniformName::new("_ShapeScale");
pub const DETAIL_SCALE: UniformName = UniformName::new("_DetailScale");
pub const WEATHER_SCALE: UniformName = UniformName::new("weatherScale");
pub const BASE_SPEED: UniformName = UniformName::new("_BaseSpeed");
pub const DETAIL_SPEED: UniformName = UniformName::new("_DetailSpeed");
pub const DENSITY_MULTIPLIER: UniformName = UniformName::new("_DensMultiplier");
pub const DENSITY_OFFSET: UniformName = UniformName::new("_DensOffset");
pub const NUM_STEPS: UniformName = UniformName::new("_NumSteps");
pub const JITTER: UniformName = UniformName::new("_JitterValue");
pub const SHAPE_WEIGHT: UniformName = UniformName::new("shapeWeight");
pub const DETAIL_WEIGHT: UniformName = UniformName::new("detailWeight");
pub const WEATHER_WEIGHT: UniformName = UniformName::new("weatherWeight");
pub const PHASE_PARAMS: UniformName = UniformName::new("phaseParams");
pub const LIGHT_DENSITY_STEPS: UniformName = UniformName::new("_LightDensSteps");
pub const LIGHT_ABSORPTION: UniformName = UniformName::new("_LightAbsorption");
pub const CLOUD_LIGHT_ABSORPTION: UniformName = UniformName::new("_CloudLightAbsorption");
pub const DARKNESS_THRESHOLD: UniformName = UniformName::new("_DarknessThreshold");
pub const SHADOW_JITTER: UniformName = UniformName::new("_ShadowJitter");
pub const SHADOW_STEPS: UniformName = UniformName::new("_ShadowSteps");
// Name matches the shader property, typo included.
pub const RECEIVE_DETAIL: UniformName = UniformName::new("_ReceiveDetal");
pub const SHADOWS_ENABLED: UniformName = UniformName::new("_ShadowsEnabled");

// ─── Settings ─────────────────────────────────────────────────────────────────

/// World-space box the clouds live in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudContainer {
    pub pos: Vec3,
    pub scale: Vec3,
}

impl CloudContainer {
    #[inline]
    #[must_use]
    pub fn bounds_min(&self) -> Vec3 {
        self.pos - self.scale / 2.0
    }

    #[inline]
    #[must_use]
    pub fn bounds_max(&self) -> Vec3 {
        self.pos + self.scale / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudRaymarch {
    /// Primary ray steps (>= 1).
    pub steps: f32,
    pub jitter: f32,
}

impl Default for CloudRaymarch {
    fn default() -> Self {
        Self {
            steps: 1.0,
            jitter: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudShadows {
    pub enabled: bool,
    /// Sample detail noise when marching shadow rays.
    pub receive_detail: bool,
    /// Default: `3`
    pub steps: f32,
    /// Default: `2`
    pub jitter: f32,
}

impl Default for CloudShadows {
    fn default() -> Self {
        Self {
            enabled: false,
            receive_detail: false,
            steps: 3.0,
            jitter: 2.0,
        }
    }
}

/// Lighting and phase function settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudLighting {
    pub light_dens_steps: f32,
    pub light_absorption: f32,
    pub cloud_light_absorption: f32,
    /// Range `[0, 1]`.
    pub darkness_threshold: f32,

    /// Default: `0.915`
    pub back_scattering: f32,
    /// Default: `0.867`
    pub front_scattering: f32,
    /// Default: `1.0`
    pub base_brightness: f32,
    /// Default: `0.43`
    pub phase_intensity: f32,

    pub shadows: CloudShadows,
}

impl Default for CloudLighting {
    fn default() -> Self {
        Self {
            light_dens_steps: 0.0,
            light_absorption: 0.0,
            cloud_light_absorption: 0.0,
            darkness_threshold: 0.0,
            back_scattering: 0.915,
            front_scattering: 0.867,
            base_brightness: 1.0,
            phase_intensity: 0.43,
            shadows: CloudShadows::default(),
        }
    }
}

impl CloudLighting {
    /// Derives the packed phase function coefficients.
    #[must_use]
    pub fn phase_parameters(&self) -> PhaseParameters {
        PhaseParameters::new(
            self.back_scattering,
            self.front_scattering,
            self.base_brightness,
            self.phase_intensity,
        )
    }
}

/// Noise textures, their scales and animation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudShape {
    pub cloud_offset: Vec3,
    pub detail_offset: Vec3,

    pub shape_noise: Option<TextureId>,
    pub detail_texture: Option<TextureId>,
    pub weather_map: Option<TextureId>,

    pub cloud_scale: f32,
    pub detail_scale: f32,
    pub weather_map_scale: f32,

    pub detail_speed: f32,
    pub base_speed: f32,

    pub dens_multiplier: f32,
    /// Range `[-5, 10]`.
    pub dens_offset: f32,
}

/// Blend weights of the three density sources.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudWeights {
    pub shape_weight: f32,
    pub detail_weight: f32,
    pub weather_weight: f32,
}

/// Volumetric cloud configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumetricCloudSettings {
    /// `1`, `2`, `3` or `4`.
    ///
    /// Default: `1`
    pub downsampling: i32,
    pub container: CloudContainer,
    pub raymarch: CloudRaymarch,
    pub shape: CloudShape,
    pub weights: CloudWeights,
    pub lighting: CloudLighting,
    /// Default: [`InjectionPoint::AfterPostProcessing`]
    pub injection: InjectionPoint,
}

impl Default for VolumetricCloudSettings {
    fn default() -> Self {
        Self {
            downsampling: 1,
            container: CloudContainer::default(),
            raymarch: CloudRaymarch::default(),
            shape: CloudShape::default(),
            weights: CloudWeights::default(),
            lighting: CloudLighting::default(),
            injection: InjectionPoint::AfterPostProcessing,
        }
    }
}

uniform_table! {
    VolumetricCloudSettings => |s| {
        BOUNDS_MIN => s.container.bounds_min(),
        BOUNDS_MAX => s.container.bounds_max(),

        SHAPE_NOISE => s.shape.shape_noise,
        DETAIL_NOISE => s.shape.detail_texture,
        WEATHER_MAP => s.shape.weather_map,

        SHAPE_OFFSET => s.shape.cloud_offset,
        DETAIL_OFFSET => s.shape.detail_offset,
        SHAPE_SCALE => s.shape.cloud_scale,
        DETAIL_SCALE => s.shape.detail_scale,
        WEATHER_SCALE => s.shape.weather_map_scale,
        BASE_SPEED => s.shape.base_speed,
        DETAIL_SPEED => s.shape.detail_speed,
        DENSITY_MULTIPLIER => s.shape.dens_multiplier,
        DENSITY_OFFSET => s.shape.dens_offset,

        NUM_STEPS => s.raymarch.steps,
        JITTER => s.raymarch.jitter,

        SHAPE_WEIGHT => s.weights.shape_weight,
        DETAIL_WEIGHT => s.weights.detail_weight,
        WEATHER_WEIGHT => s.weights.weather_weight,

        PHASE_PARAMS => s.lighting.phase_parameters().to_vec4(),
        LIGHT_DENSITY_STEPS => s.lighting.light_dens_steps,
        LIGHT_ABSORPTION => s.lighting.light_absorption,
        CLOUD_LIGHT_ABSORPTION => s.lighting.cloud_light_absorption,
        DARKNESS_THRESHOLD => s.lighting.darkness_threshold,

        SHADOW_JITTER => s.lighting.shadows.jitter,
        SHADOW_STEPS => s.lighting.shadows.steps,
        RECEIVE_DETAIL => s.lighting.shadows.receive_detail,
        SHADOWS_ENABLED => s.lighting.shadows.enabled,
    }
}

/// Downsampled cloud buffer.
pub const CLOUDS: SlotId = SlotId(0);

/// Pass index of the cloud raymarch.
pub const CLOUD_PASS: u32 = 0;

impl EffectSettings for VolumetricCloudSettings {
    type GraphKey = ();

    fn downsample_factor(&self) -> i32 {
        self.downsampling
    }

    fn graph_key(&self) -> Self::GraphKey {}

    fn build_graph(&self) -> Result<StageGraph> {
        StageGraph::new(
            "Clouds",
            vec![BufferSlot::downsampled(CLOUDS, "clouds")],
            vec![Stage::blit(
                "clouds",
                SlotRef::Source,
                SlotRef::Slot(CLOUDS),
                CLOUD_PASS,
            )],
        )
    }
}

pub const NAME: &str = "Volumetric Clouds";

/// Creates the host feature.
#[must_use]
pub fn feature(
    settings: SharedSettings<VolumetricCloudSettings>,
    program: Option<ProgramId>,
) -> EffectFeature<VolumetricCloudSettings> {
    let injection = settings.snapshot().injection;
    EffectFeature::new(NAME, settings, injection).with_program(program)
}
