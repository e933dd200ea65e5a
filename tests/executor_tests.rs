//! FrameExecutor tests
//!
//! Tests for:
//! - The 1920x1080 / factor 2 / Full production frame
//! - Configuration failures and the Unconfigured no-op state
//! - Mid-graph stage failures (partial submit, full release)
//! - Debug topologies (ThroughBlur order, RaymarchOnly direct overwrite)
//! - Halting on a scratch stage and writing it back
//! - Scratch lifetime across aborted frames and acquisition failures

use nimbus::core::{BackendError, ColorTarget, NimbusError};
use nimbus::effects::VolumetricLightSettings;
use nimbus::render::graph::topology::{LOW_RES, TEMP};
use nimbus::render::{
    BufferSlot, DebugStage, EffectSettings, FrameExecutor, FrameInput, FrameOutcome,
    LOW_RES_DEPTH, PipelineState, PublishedGlobals, SlotRef, Stage, StageGraph, Target,
    UniformName, VOLUMETRIC_TEXTURE,
};
use nimbus_dev_utils::{Command, RecordingBackend};

// ============================================================================
// Helpers
// ============================================================================

const SOURCE: ColorTarget = ColorTarget(7);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn settings(downsampling: i32, stage: DebugStage) -> VolumetricLightSettings {
    VolumetricLightSettings {
        downsampling,
        stage,
        ..Default::default()
    }
}

struct Harness {
    backend: RecordingBackend,
    globals: PublishedGlobals,
    executor: FrameExecutor<VolumetricLightSettings>,
    settings: VolumetricLightSettings,
}

impl Harness {
    fn new(settings: VolumetricLightSettings) -> Self {
        init_logging();
        let mut backend = RecordingBackend::new();
        let program = backend.register_program(5);
        let mut executor = FrameExecutor::new("Volumetric Light");
        let _ = executor.configure(&backend, Some(program), &settings);
        Self {
            backend,
            globals: PublishedGlobals::new(),
            executor,
            settings,
        }
    }

    fn frame(&mut self, width: i32, height: i32, frame: u64) -> nimbus::Result<nimbus::render::FrameReport> {
        self.executor.execute(
            &mut self.backend,
            &mut self.globals,
            &FrameInput::new(SOURCE, width, height, frame),
            &self.settings,
        )
    }

    fn passes(&self) -> Vec<Option<u32>> {
        self.backend
            .submitted_blits()
            .iter()
            .map(|(_, _, pass)| *pass)
            .collect()
    }
}

// ============================================================================
// Production Frame
// ============================================================================

#[test]
fn full_frame_at_half_resolution() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    assert_eq!(h.executor.state(), PipelineState::Validated);

    let report = h.frame(1920, 1080, 0).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Completed);
    assert_eq!(report.stages_executed, 5);
    assert_eq!(report.blits, 6);
    assert!(report.wrote_back);
    assert_eq!(h.executor.state(), PipelineState::Executed);

    let sizes: Vec<_> = h
        .backend
        .acquired_descs()
        .iter()
        .map(|d| (d.label, d.width, d.height, d.sample_count))
        .collect();
    assert_eq!(
        sizes,
        vec![
            ("temp", 960, 540, 1),
            ("low_res", 960, 540, 1),
            ("composite", 1920, 1080, 1),
        ]
    );

    assert_eq!(h.passes(), vec![Some(0), Some(1), Some(2), Some(4), Some(3), None]);

    // Final copy lands in the source handle and comes from the native buffer.
    let blits = h.backend.submitted_blits();
    let (last_src, last_dst, _) = blits[blits.len() - 1];
    assert_eq!(last_dst, Target::Source(SOURCE));
    let Target::Scratch(composite) = last_src else {
        panic!("write-back must read a scratch buffer, got {last_src:?}");
    };
    let desc = h.backend.scratch_desc(composite).unwrap();
    assert_eq!((desc.width, desc.height), (1920, 1080));

    // Exactly two globals published, in graph order.
    assert_eq!(report.published.as_slice(), &[VOLUMETRIC_TEXTURE, LOW_RES_DEPTH]);
    assert_eq!(
        h.backend.submitted_globals(),
        vec![VOLUMETRIC_TEXTURE, LOW_RES_DEPTH]
    );
    assert_eq!(h.globals.len(), 2);

    // Uniforms are uploaded before the first blit.
    assert!(matches!(
        h.backend.submitted()[0],
        Command::SetUniforms { .. }
    ));

    assert_eq!(h.executor.release(&mut h.backend), 3);
    assert_eq!(h.executor.state(), PipelineState::Released);
    assert_eq!(h.backend.acquire_count(), h.backend.release_count());
    assert_eq!(h.backend.live_scratch(), 0);
}

#[test]
fn blur_output_is_published_and_depth_reuses_low_res() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.frame(1920, 1080, 0).unwrap();

    let blits = h.backend.submitted_blits();
    // blur_y writes temp; depth_downsample writes low_res.
    assert_eq!(h.globals.lookup(VOLUMETRIC_TEXTURE), Some(blits[2].1));
    assert_eq!(h.globals.lookup(LOW_RES_DEPTH), Some(blits[3].1));
    assert_eq!(blits[1].1, blits[3].1);
    assert_eq!(h.globals.publisher(LOW_RES_DEPTH), Some("depth_downsample"));
}

#[test]
fn steady_state_frames_reuse_plan() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    for frame in 0..3 {
        h.frame(1920, 1080, frame).unwrap();
        h.executor.release(&mut h.backend);
    }
    assert_eq!(h.executor.allocator().plan_builds(), 1);

    h.frame(1280, 720, 3).unwrap();
    h.executor.release(&mut h.backend);
    assert_eq!(h.executor.allocator().plan_builds(), 2);
    assert_eq!(h.executor.frames_executed(), 4);
    assert_eq!(h.backend.acquire_count(), 12);
    assert_eq!(h.backend.release_count(), 12);
}

// ============================================================================
// Configuration Errors
// ============================================================================

#[test]
fn factor_zero_stays_unconfigured_and_allocates_nothing() {
    init_logging();
    let mut backend = RecordingBackend::new();
    let program = backend.register_program(5);
    let bad = settings(0, DebugStage::Full);

    let mut executor = FrameExecutor::new("Volumetric Light");
    let err = executor.configure(&backend, Some(program), &bad).unwrap_err();
    assert!(matches!(err, NimbusError::InvalidConfiguration(_)));
    assert_eq!(executor.state(), PipelineState::Unconfigured);

    let mut globals = PublishedGlobals::new();
    let report = executor
        .execute(
            &mut backend,
            &mut globals,
            &FrameInput::new(SOURCE, 1920, 1080, 0),
            &bad,
        )
        .unwrap();
    assert!(report.is_skipped());
    assert_eq!(backend.acquire_count(), 0);
    assert!(backend.submitted().is_empty());
    assert_eq!(executor.state(), PipelineState::Unconfigured);
}

#[test]
fn negative_and_oversized_factors_are_rejected() {
    let backend = {
        let mut b = RecordingBackend::new();
        b.register_program(5);
        b
    };
    for raw in [-2, -1, 5, 16] {
        let mut executor = FrameExecutor::new("Volumetric Light");
        let err = executor
            .configure(&backend, Some(nimbus::core::ProgramId(0)), &settings(raw, DebugStage::Full))
            .unwrap_err();
        assert!(err.is_configuration(), "factor {raw}: {err}");
        assert_eq!(executor.state(), PipelineState::Unconfigured);
    }
}

#[test]
fn missing_program_is_a_configuration_error() {
    let backend = RecordingBackend::new();
    let mut executor = FrameExecutor::<VolumetricLightSettings>::new("Volumetric Light");
    let s = settings(1, DebugStage::Full);

    assert!(executor.configure(&backend, None, &s).unwrap_err().is_configuration());
    assert!(
        executor
            .configure(&backend, Some(nimbus::core::ProgramId(42)), &s)
            .unwrap_err()
            .is_configuration()
    );
    assert_eq!(executor.state(), PipelineState::Unconfigured);
}

#[test]
fn non_positive_dimensions_fail_without_allocating() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    let err = h.frame(0, 1080, 0).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(h.executor.state(), PipelineState::Unconfigured);

    // Later frames with bad dimensions stay unconfigured and do nothing.
    for (frame, (w, h_)) in [(1920, 0), (-1, 720), (0, 1080)].into_iter().enumerate() {
        let report = h.frame(w, h_, frame as u64 + 1).unwrap();
        assert!(report.is_skipped());
        assert_eq!(h.executor.state(), PipelineState::Unconfigured);
    }
    assert_eq!(h.backend.acquire_count(), 0);
    assert!(h.backend.submitted().is_empty());

    // Valid dimensions recover on the next frame.
    let report = h.frame(1920, 1080, 4).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Completed);
}

#[test]
fn unconfigured_executor_recovers_when_settings_become_valid() {
    let mut h = Harness::new(settings(0, DebugStage::Full));
    assert_eq!(h.executor.state(), PipelineState::Unconfigured);
    assert!(h.frame(1920, 1080, 0).unwrap().is_skipped());

    h.settings.downsampling = 4;
    let report = h.frame(1920, 1080, 1).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Completed);
    assert_eq!(h.backend.acquired_descs()[0].width, 480);
}

#[test]
fn unloaded_program_returns_to_unconfigured() {
    let mut h = Harness::new(settings(1, DebugStage::Full));
    h.frame(640, 480, 0).unwrap();
    h.executor.release(&mut h.backend);

    let program = h.executor.program().unwrap();
    h.backend.remove_program(program);

    let err = h.frame(640, 480, 1).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(h.executor.state(), PipelineState::Unconfigured);

    // Subsequent frames are silent no-ops.
    assert!(h.frame(640, 480, 2).unwrap().is_skipped());
    assert_eq!(h.backend.acquire_count(), h.backend.release_count());
}

// ============================================================================
// Stage Failures
// ============================================================================

#[test]
fn stage_two_of_five_fails() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.backend.fail_pass(2);

    let err = h.frame(1920, 1080, 0).unwrap_err();
    match &err {
        NimbusError::StageExecution {
            feature,
            stage,
            pass,
            ..
        } => {
            assert_eq!(feature, "Volumetric Light");
            assert_eq!(*stage, "blur_y");
            assert_eq!(*pass, Some(2));
        }
        other => panic!("expected StageExecution, got {other:?}"),
    }
    assert!(!err.is_configuration());

    // Stages 0 and 1 were submitted; 2..4 and the write-back were skipped.
    assert_eq!(h.passes(), vec![Some(0), Some(1)]);
    assert!(h.backend.submitted_globals().is_empty());
    assert!(h.backend.pending().is_empty());

    // Everything acquired was released.
    assert_eq!(h.backend.acquire_count(), 3);
    assert_eq!(h.backend.release_count(), 3);
    assert_eq!(h.executor.allocator().active_count(), 0);
    assert!(h.globals.is_empty());
    assert_eq!(h.executor.state(), PipelineState::Released);
    assert_eq!(h.executor.frames_failed(), 1);
}

#[test]
fn frame_after_failure_runs_normally() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.backend.fail_nth_blit(2);
    assert!(h.frame(1920, 1080, 0).is_err());

    h.backend.clear_faults();
    h.backend.take_submitted();
    let report = h.frame(1920, 1080, 1).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Completed);
    assert_eq!(h.passes(), vec![Some(0), Some(1), Some(2), Some(4), Some(3), None]);
}

#[test]
fn failure_after_publish_retracts_globals() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    // composite (pass 3) fails after both globals were published.
    h.backend.fail_pass(3);
    let err = h.frame(1920, 1080, 0).unwrap_err();
    assert!(matches!(err, NimbusError::StageExecution { stage: "composite", .. }));
    assert!(h.globals.is_empty());
    assert_eq!(h.backend.live_scratch(), 0);

    // The partial stream binds both globals, then unbinds them again before
    // their buffers are released.
    let global_commands: Vec<_> = h
        .backend
        .submitted()
        .iter()
        .filter_map(|c| match c {
            Command::SetGlobal { name, .. } => Some(("set", *name)),
            Command::ClearGlobal { name } => Some(("clear", *name)),
            _ => None,
        })
        .collect();
    assert_eq!(
        global_commands,
        vec![
            ("set", VOLUMETRIC_TEXTURE),
            ("set", LOW_RES_DEPTH),
            ("clear", VOLUMETRIC_TEXTURE),
            ("clear", LOW_RES_DEPTH),
        ]
    );
    assert_eq!(h.backend.bound_global(VOLUMETRIC_TEXTURE), None);
    assert_eq!(h.backend.bound_global(LOW_RES_DEPTH), None);
}

#[test]
fn invalid_pass_index_is_a_stage_failure() {
    init_logging();
    let mut backend = RecordingBackend::new();
    // Program only has raymarch + blur passes.
    let program = backend.register_program(3);
    let s = settings(1, DebugStage::Full);
    let mut executor = FrameExecutor::new("Volumetric Light");
    executor.configure(&backend, Some(program), &s).unwrap();

    let mut globals = PublishedGlobals::new();
    let err = executor
        .execute(
            &mut backend,
            &mut globals,
            &FrameInput::new(SOURCE, 800, 600, 0),
            &s,
        )
        .unwrap_err();
    match err {
        NimbusError::StageExecution { stage, source, .. } => {
            assert_eq!(stage, "depth_downsample");
            assert!(matches!(source, BackendError::InvalidPass { pass: 4, .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_ne!(executor.state(), PipelineState::Unconfigured);
    assert_eq!(backend.acquire_count(), backend.release_count());
}

#[test]
fn submit_failure_releases_scratch() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.backend.fail_submit(true);
    let err = h.frame(1920, 1080, 0).unwrap_err();
    assert!(matches!(err, NimbusError::Backend(BackendError::Rejected(_))));
    assert_eq!(h.backend.live_scratch(), 0);
    assert!(h.globals.is_empty());
}

#[test]
fn acquisition_failure_leaks_nothing() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.backend.fail_acquire_after(2);
    let err = h.frame(1920, 1080, 0).unwrap_err();
    assert!(matches!(err, NimbusError::Backend(BackendError::OutOfMemory(_))));
    assert_eq!(h.backend.acquire_count(), 2);
    assert_eq!(h.backend.release_count(), 2);
    assert!(h.backend.submitted().is_empty());
}

// ============================================================================
// Debug Topologies
// ============================================================================

#[test]
fn through_blur_issues_passes_in_order() {
    let mut h = Harness::new(settings(2, DebugStage::ThroughBlur));
    let report = h.frame(1920, 1080, 0).unwrap();
    assert_eq!(h.passes(), vec![Some(0), Some(1), Some(2)]);
    assert!(!report.wrote_back);
    assert!(report.published.is_empty());

    let blits = h.backend.submitted_blits();
    assert_eq!(blits[0].0, Target::Source(SOURCE));
    assert_eq!(blits[2].1, Target::Source(SOURCE));
}

#[test]
fn raymarch_only_overwrites_source() {
    let mut h = Harness::new(settings(2, DebugStage::RaymarchOnly));
    let report = h.frame(1920, 1080, 0).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Halted { stage: "raymarch" });
    assert_eq!(report.stages_executed, 2);
    assert!(!report.wrote_back);
    assert_eq!(h.passes(), vec![None, Some(0)]);

    // Copy the source aside, then raymarch from the copy into the source.
    let blits = h.backend.submitted_blits();
    assert_eq!(blits[0].0, Target::Source(SOURCE));
    assert_eq!(blits[0].1, blits[1].0);
    assert_eq!(blits[1].1, Target::Source(SOURCE));

    let sizes: Vec<_> = h
        .backend
        .acquired_descs()
        .iter()
        .map(|d| (d.label, d.width, d.height))
        .collect();
    assert_eq!(sizes, vec![("temp", 960, 540)]);
    assert_eq!(h.executor.release(&mut h.backend), 1);
}

#[test]
fn switching_topology_between_frames() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.frame(1920, 1080, 0).unwrap();
    h.executor.release(&mut h.backend);
    h.backend.take_submitted();

    h.settings.stage = DebugStage::ThroughBlur;
    h.frame(1920, 1080, 1).unwrap();
    assert_eq!(h.passes(), vec![Some(0), Some(1), Some(2)]);
    assert_eq!(h.executor.graph().unwrap().name(), "ThroughBlur");
}

// ============================================================================
// Halting
// ============================================================================

const INSPECT_STEPS: UniformName = UniformName::new("_Steps");

/// Raymarch + blur graph that stops after the raymarch, leaving its output in
/// a scratch buffer.
#[derive(Clone)]
struct InspectRaymarch {
    downsampling: i32,
    steps: f32,
}

nimbus::uniform_table! {
    InspectRaymarch => |s| {
        INSPECT_STEPS => s.steps,
    }
}

impl EffectSettings for InspectRaymarch {
    type GraphKey = ();

    fn downsample_factor(&self) -> i32 {
        self.downsampling
    }

    fn graph_key(&self) -> Self::GraphKey {}

    fn build_graph(&self) -> nimbus::Result<StageGraph> {
        StageGraph::new(
            "InspectRaymarch",
            vec![
                BufferSlot::downsampled(TEMP, "temp"),
                BufferSlot::downsampled(LOW_RES, "low_res"),
            ],
            vec![
                Stage::blit("raymarch", SlotRef::Source, SlotRef::Slot(TEMP), 0).halt_after(),
                Stage::blit("blur_x", SlotRef::Slot(TEMP), SlotRef::Slot(LOW_RES), 1),
            ],
        )
    }
}

#[test]
fn halted_scratch_stage_is_written_back() {
    init_logging();
    let mut backend = RecordingBackend::new();
    let program = backend.register_program(2);
    let inspect = InspectRaymarch {
        downsampling: 2,
        steps: 16.0,
    };
    let mut executor = FrameExecutor::new("Inspect");
    executor.configure(&backend, Some(program), &inspect).unwrap();

    let mut globals = PublishedGlobals::new();
    let report = executor
        .execute(
            &mut backend,
            &mut globals,
            &FrameInput::new(SOURCE, 1280, 720, 0),
            &inspect,
        )
        .unwrap();
    assert_eq!(report.outcome, FrameOutcome::Halted { stage: "raymarch" });
    assert_eq!(report.stages_executed, 1);
    assert!(report.wrote_back);

    let blits = backend.submitted_blits();
    assert_eq!(blits.len(), 2);
    assert_eq!(blits[1], (blits[0].1, Target::Source(SOURCE), None));
    assert_eq!(
        backend.last_uniforms(program).unwrap().float(INSPECT_STEPS),
        Some(16.0)
    );
    executor.release(&mut backend);
    assert_eq!(backend.live_scratch(), 0);
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn unreleased_frame_is_released_before_next_acquire() {
    let mut h = Harness::new(settings(2, DebugStage::Full));
    h.frame(1920, 1080, 0).unwrap();
    // Host abandons the frame without calling release.
    h.frame(1920, 1080, 1).unwrap();
    assert_eq!(h.backend.acquire_count(), 6);
    assert_eq!(h.backend.release_count(), 3);
    assert_eq!(h.backend.live_scratch(), 3);

    h.executor.release(&mut h.backend);
    assert_eq!(h.backend.acquire_count(), h.backend.release_count());
}

#[test]
fn binder_runs_every_frame() {
    let mut h = Harness::new(settings(1, DebugStage::Full));
    h.frame(640, 480, 0).unwrap();
    h.executor.release(&mut h.backend);

    h.settings.intensity = 3.0;
    h.frame(640, 480, 1).unwrap();
    let program = h.executor.program().unwrap();
    let uniforms = h.backend.last_uniforms(program).unwrap();
    assert_eq!(
        uniforms.float(nimbus::effects::volumetric_lights::INTENSITY),
        Some(3.0)
    );
    assert_eq!(h.executor.material().unwrap().uniforms(), uniforms);
}
