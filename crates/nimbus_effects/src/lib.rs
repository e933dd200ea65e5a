//! Nimbus Effects
//!
//! Concrete effects expressed as declarative stage graphs:
//!
//! | Module | Graph | Default injection |
//! |--------|-------|-------------------|
//! | [`volumetric_lights`] | raymarch, blur X/Y, depth downsample, composite | after post-processing |
//! | [`volumetric_clouds`] | cloud raymarch, write back | after post-processing |
//! | [`light_scattering`] | occluder mask, radial blur | before post-processing |
//!
//! Each module exposes its settings record, its uniform names and a
//! `feature()` constructor returning an [`EffectFeature`].

pub mod feature;
pub mod light_scattering;
pub mod phase;
pub mod volumetric_clouds;
pub mod volumetric_lights;

pub use feature::EffectFeature;
pub use light_scattering::{LightScatteringSettings, ScatteringQuality};
pub use phase::PhaseParameters;
pub use volumetric_clouds::VolumetricCloudSettings;
pub use volumetric_lights::{GaussBlur, VolumetricLightSettings};
