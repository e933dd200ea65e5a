//! # Nimbus
//!
//! Engine-agnostic multi-stage post-processing for volumetric effects.
//!
//! Effects are declarative stage graphs (downsample → process → blur →
//! composite) driven once per frame by a generic executor against the host
//! renderer's [`RenderBackend`](render::RenderBackend).
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`core`] | errors, extents, handles, shared settings |
//! | [`render`] | stage graph, allocator, binder, executor, feature stack |
//! | [`effects`] | volumetric lights, volumetric clouds, light scattering |
//!
//! ```rust,ignore
//! use nimbus::prelude::*;
//!
//! let lights = SharedSettings::new(VolumetricLightSettings::default());
//! let mut stack = FeatureStack::new();
//! stack.add(Box::new(nimbus::effects::volumetric_lights::feature(lights, Some(program))));
//! stack.configure(&backend);
//!
//! let summary = stack.run_frame(&mut backend, &FrameInput::new(camera_target, 1920, 1080, frame));
//! stack.end_frame(&mut backend);
//! ```

pub use glam;

pub use nimbus_core as core;
pub use nimbus_effects as effects;
pub use nimbus_render as render;
pub use nimbus_render::uniform_table;

pub use nimbus_core::{NimbusError, Result};

pub mod prelude {
    pub use nimbus_core::{
        BackendError, ColorTarget, DownsampleFactor, Extent, NimbusError, ProgramId, Result,
        ScratchHandle, SharedSettings, TextureId,
    };
    pub use nimbus_effects::{
        EffectFeature, LightScatteringSettings, PhaseParameters, ScatteringQuality,
        VolumetricCloudSettings, VolumetricLightSettings,
    };
    pub use nimbus_render::{
        DebugStage, EffectSettings, FeatureStack, FrameExecutor, FrameInput, FrameOutcome,
        FrameReport, InjectionPoint, PipelineState, PublishedGlobals, RenderBackend,
        RenderFeature, ShaderParameters, Target, UniformBlock, UniformName,
    };
}
