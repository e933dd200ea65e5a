//! Frame Trace
//!
//! Runs the three Nimbus effects against a recording backend and prints the
//! command stream each frame submits.
//!
//! Usage:
//!
//! ```text
//! frame_trace [SETTINGS_DIR] [FRAMES] [WIDTHxHEIGHT]
//! ```
//!
//! `SETTINGS_DIR` must contain `volumetric_lights.json`,
//! `volumetric_clouds.json` and `light_scattering.json`. Missing fields take
//! their defaults. Set `RUST_LOG=debug` to see plan rebuilds.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use nimbus::core::settings::load_json;
use nimbus::effects::{light_scattering, volumetric_clouds, volumetric_lights};
use nimbus::prelude::*;
use nimbus_dev_utils::RecordingBackend;

const DEFAULT_FRAMES: u64 = 2;
const DEFAULT_SIZE: (i32, i32) = (1920, 1080);

fn parse_size(arg: &str) -> anyhow::Result<(i32, i32)> {
    let Some((w, h)) = arg.split_once('x') else {
        bail!("expected WIDTHxHEIGHT, got '{arg}'");
    };
    Ok((w.parse().context("width")?, h.parse().context("height")?))
}

fn load<S: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<S> {
    let path = dir.join(file);
    load_json(&path).with_context(|| format!("loading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let dir = args.next().map_or_else(
        || PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/settings")),
        PathBuf::from,
    );
    let frames = match args.next() {
        Some(arg) => arg.parse().context("frame count")?,
        None => DEFAULT_FRAMES,
    };
    let (width, height) = match args.next() {
        Some(arg) => parse_size(&arg)?,
        None => DEFAULT_SIZE,
    };

    let lights: VolumetricLightSettings = load(&dir, "volumetric_lights.json")?;
    let clouds: VolumetricCloudSettings = load(&dir, "volumetric_clouds.json")?;
    let scattering: LightScatteringSettings = load(&dir, "light_scattering.json")?;

    let mut backend = RecordingBackend::new();
    let volumetric_program = backend.register_program(5);
    let cloud_program = backend.register_program(1);
    let scattering_program = backend.register_program(2);

    let mut stack = FeatureStack::new();
    stack.add(Box::new(volumetric_lights::feature(
        SharedSettings::new(lights),
        Some(volumetric_program),
    )));
    stack.add(Box::new(volumetric_clouds::feature(
        SharedSettings::new(clouds),
        Some(cloud_program),
    )));
    stack.add(Box::new(light_scattering::feature(
        SharedSettings::new(scattering),
        Some(scattering_program),
    )));

    for (name, err) in stack.configure(&backend) {
        log::warn!("{name} will be skipped: {err}");
    }
    println!(
        "Execution order: {}",
        stack.names().collect::<Vec<_>>().join(" -> ")
    );

    let camera_target = ColorTarget(0);
    for frame in 0..frames {
        let input = FrameInput::new(camera_target, width, height, frame);
        let summary = stack.run_frame(&mut backend, &input);

        println!("\n== frame {frame} ({width}x{height}) ==");
        for cmd in backend.take_submitted() {
            println!("  {cmd}");
        }
        for result in &summary.results {
            match &result.result {
                Ok(report) => println!(
                    "  [{}] {:?}: {} stages, {} blits, published {:?}",
                    result.name,
                    report.outcome,
                    report.stages_executed,
                    report.blits,
                    report.published.iter().map(|g| g.as_str()).collect::<Vec<_>>()
                ),
                Err(e) => println!("  [{}] failed: {e}", result.name),
            }
        }

        let released = stack.end_frame(&mut backend);
        println!("  released {released} scratch buffers");
    }

    println!(
        "\nScratch traffic: {} acquired, {} released, {} live",
        backend.acquire_count(),
        backend.release_count(),
        backend.live_scratch()
    );
    Ok(())
}
