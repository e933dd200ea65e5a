//! Effect tests
//!
//! Tests for:
//! - Settings loading (JSON defaults, partial records, bundled demo files)
//! - Volumetric clouds graph execution
//! - Light scattering graph execution and sun projection

use std::path::PathBuf;

use nimbus::core::settings::{from_json_str, load_json};
use nimbus::core::{ColorTarget, NimbusError, TextureId};
use nimbus::effects::light_scattering::{self, sun_viewport_position};
use nimbus::effects::{
    LightScatteringSettings, ScatteringQuality, VolumetricCloudSettings, VolumetricLightSettings,
};
use nimbus::glam::{Mat4, Vec2, Vec3, Vec4};
use nimbus::render::{
    DebugStage, EffectSettings, FrameExecutor, FrameInput, FrameOutcome, InjectionPoint,
    PipelineState, PublishedGlobals, Target,
};
use nimbus_dev_utils::RecordingBackend;

// ============================================================================
// Helpers
// ============================================================================

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn demo_settings(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demo_apps/frame_trace/settings")
        .join(file)
}

fn run_once<S: EffectSettings>(
    backend: &mut RecordingBackend,
    executor: &mut FrameExecutor<S>,
    settings: &S,
    width: i32,
    height: i32,
) -> nimbus::Result<nimbus::render::FrameReport> {
    let mut globals = PublishedGlobals::new();
    executor.execute(
        backend,
        &mut globals,
        &FrameInput::new(ColorTarget(1), width, height, 0),
        settings,
    )
}

fn passes(backend: &RecordingBackend) -> Vec<Option<u32>> {
    backend
        .submitted_blits()
        .iter()
        .map(|(_, _, pass)| *pass)
        .collect()
}

// ============================================================================
// Settings Loading
// ============================================================================

#[test]
fn empty_json_yields_defaults() {
    let lights: VolumetricLightSettings = from_json_str("{}").unwrap();
    assert_eq!(lights, VolumetricLightSettings::default());

    let clouds: VolumetricCloudSettings = from_json_str("{}").unwrap();
    assert_eq!(clouds, VolumetricCloudSettings::default());

    let scattering: LightScatteringSettings = from_json_str("{}").unwrap();
    assert_eq!(scattering, LightScatteringSettings::default());
}

#[test]
fn documented_defaults() {
    let lights = VolumetricLightSettings::default();
    assert_eq!(lights.downsampling, 1);
    assert_eq!(lights.stage, DebugStage::Full);
    assert_eq!(lights.steps, 24.0);
    assert_eq!(lights.max_distance, 75.0);
    assert_eq!(lights.jitter, 250.0);
    assert_eq!(lights.injection, InjectionPoint::AfterPostProcessing);

    let clouds = VolumetricCloudSettings::default();
    assert_eq!(clouds.raymarch.steps, 1.0);
    assert!(approx_eq(clouds.lighting.back_scattering, 0.915));
    assert!(approx_eq(clouds.lighting.front_scattering, 0.867));
    assert_eq!(clouds.lighting.shadows.steps, 3.0);

    let scattering = LightScatteringSettings::default();
    assert_eq!(scattering.resolution_scale, 0.5);
    assert_eq!(scattering.sun_viewport_position, Vec2::splat(0.5));
    assert_eq!(scattering.injection, InjectionPoint::BeforePostProcessing);
}

#[test]
fn partial_json_keeps_remaining_defaults() {
    let lights: VolumetricLightSettings = from_json_str(
        r#"{ "downsampling": 3, "stage": "through_blur", "gauss_blur": { "samples": 6 } }"#,
    )
    .unwrap();
    assert_eq!(lights.downsampling, 3);
    assert_eq!(lights.stage, DebugStage::ThroughBlur);
    assert_eq!(lights.gauss_blur.samples, 6.0);
    assert_eq!(lights.gauss_blur.amount, 0.0);
    assert_eq!(lights.intensity, 1.0);

    let scattering: LightScatteringSettings =
        from_json_str(r#"{ "quality": "high", "injection": "after_post_processing" }"#).unwrap();
    assert_eq!(scattering.quality, ScatteringQuality::High);
    assert_eq!(scattering.injection, InjectionPoint::AfterPostProcessing);
}

#[test]
fn malformed_json_is_a_configuration_error() {
    let err = from_json_str::<VolumetricLightSettings>(r#"{ "stage": "sideways" }"#).unwrap_err();
    assert!(matches!(err, NimbusError::Settings(_)));
    assert!(err.is_configuration());
}

#[test]
fn missing_file_is_a_configuration_error() {
    let err = load_json::<VolumetricLightSettings>(demo_settings("does_not_exist.json"))
        .unwrap_err();
    assert!(matches!(err, NimbusError::Io(_)));
    assert!(err.is_configuration());
}

#[test]
fn bundled_demo_settings_load() -> anyhow::Result<()> {
    let lights: VolumetricLightSettings = load_json(demo_settings("volumetric_lights.json"))?;
    assert_eq!(lights.downsampling, 2);
    assert_eq!(lights.tint, Vec4::new(1.0, 0.95, 0.85, 1.0));

    let clouds: VolumetricCloudSettings = load_json(demo_settings("volumetric_clouds.json"))?;
    assert_eq!(clouds.downsampling, 4);
    assert_eq!(clouds.shape.shape_noise, Some(TextureId(11)));
    assert!(clouds.lighting.shadows.enabled);
    // Unlisted lighting fields keep their defaults.
    assert!(approx_eq(clouds.lighting.phase_intensity, 0.43));

    let scattering: LightScatteringSettings = load_json(demo_settings("light_scattering.json"))?;
    assert_eq!(scattering.quality, ScatteringQuality::High);
    Ok(())
}

// ============================================================================
// Volumetric Clouds
// ============================================================================

#[test]
fn clouds_raymarch_then_write_back() {
    let mut backend = RecordingBackend::new();
    let program = backend.register_program(1);
    let settings = VolumetricCloudSettings {
        downsampling: 4,
        ..Default::default()
    };
    let mut executor = FrameExecutor::new("Volumetric Clouds");
    executor.configure(&backend, Some(program), &settings).unwrap();

    let report = run_once(&mut backend, &mut executor, &settings, 1920, 1080).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Completed);
    assert!(report.wrote_back);
    assert!(report.published.is_empty());
    assert_eq!(passes(&backend), vec![Some(0), None]);

    let desc = &backend.acquired_descs()[0];
    assert_eq!((desc.label, desc.width, desc.height), ("clouds", 480, 270));

    executor.release(&mut backend);
    assert_eq!(backend.live_scratch(), 0);
}

#[test]
fn clouds_with_invalid_factor_skip() {
    let mut backend = RecordingBackend::new();
    let program = backend.register_program(1);
    let settings = VolumetricCloudSettings {
        downsampling: 8,
        ..Default::default()
    };
    let mut executor = FrameExecutor::new("Volumetric Clouds");
    assert!(executor.configure(&backend, Some(program), &settings).is_err());

    let report = run_once(&mut backend, &mut executor, &settings, 1920, 1080).unwrap();
    assert!(report.is_skipped());
    assert_eq!(backend.acquire_count(), 0);
}

// ============================================================================
// Light Scattering
// ============================================================================

#[test]
fn scattering_mask_follows_resolution_scale() {
    let mut backend = RecordingBackend::new();
    let program = backend.register_program(2);
    let mut settings = LightScatteringSettings::default();
    let mut executor = FrameExecutor::new("Light Scattering");
    executor.configure(&backend, Some(program), &settings).unwrap();

    let report = run_once(&mut backend, &mut executor, &settings, 1001, 99).unwrap();
    assert!(!report.wrote_back);
    assert_eq!(
        passes(&backend),
        vec![
            Some(light_scattering::OCCLUDER_PASS),
            Some(light_scattering::RADIAL_BLUR_PASS)
        ]
    );
    let blits = backend.submitted_blits();
    assert_eq!(blits[1].1, Target::Source(ColorTarget(1)));

    let desc = &backend.acquired_descs()[0];
    assert_eq!((desc.label, desc.width, desc.height), ("occluders", 501, 50));
    executor.release(&mut backend);

    settings.resolution_scale = 0.25;
    run_once(&mut backend, &mut executor, &settings, 1920, 1080).unwrap();
    let desc = &backend.acquired_descs()[1];
    assert_eq!((desc.width, desc.height), (480, 270));
    executor.release(&mut backend);
}

#[test]
fn scattering_with_zero_scale_is_unconfigured() {
    let backend = {
        let mut b = RecordingBackend::new();
        b.register_program(2);
        b
    };
    let settings = LightScatteringSettings {
        resolution_scale: 0.0,
        ..Default::default()
    };
    let mut executor = FrameExecutor::new("Light Scattering");
    let err = executor
        .configure(&backend, Some(nimbus::core::ProgramId(0)), &settings)
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(executor.state(), PipelineState::Unconfigured);
}

#[test]
fn sun_projection_moves_with_direction() {
    let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
    let view_proj = proj * view;

    let center = sun_viewport_position(view_proj, Vec3::ZERO, Vec3::NEG_Z);
    assert!(approx_eq(center.x, 0.5) && approx_eq(center.y, 0.5));

    // Up and to the right of the view direction.
    let offset = sun_viewport_position(view_proj, Vec3::ZERO, Vec3::new(0.2, 0.2, -1.0));
    assert!(offset.x > 0.5);
    assert!(offset.y > 0.5);
}
