//! Frame Executor
//!
//! Drives one effect's [`StageGraph`] once per frame against a
//! [`RenderBackend`].
//!
//! # Frame Sequence
//!
//! ```text
//! execute(backend, globals, input, settings)
//!   ├─ release scratch left over from an aborted frame
//!   ├─ Unconfigured? ── re-validate silently ── fails ──► Skipped (no-op)
//!   ├─ check program, build / reuse graph, plan scratch     (config errors ─► Unconfigured)
//!   ├─ acquire scratch                                       (all-or-nothing)
//!   ├─ bind parameters, upload uniforms                      ─► Bound
//!   ├─ walk stages in declaration order, publish globals
//!   ├─ write back to the source when the last stage did not
//!   └─ submit, clear recorder                                ─► Executed
//!
//! release(backend)                                           ─► Released
//! ```
//!
//! Scratch buffers stay alive after a successful `execute` so that published
//! globals remain valid for later passes in the same frame; the owner calls
//! [`FrameExecutor::release`] at frame end. A failing stage short-circuits
//! the walk: globals it published are unbound, the commands recorded so far
//! are still submitted, the recorder is cleared, and scratch is released
//! immediately.

use smallvec::SmallVec;

use nimbus_core::{BackendError, ColorTarget, Extent, NimbusError, ProgramId, Result};

use crate::allocator::ResourceAllocator;
use crate::backend::{RenderBackend, ShaderPass, Target};
use crate::binder::{MaterialInstance, ParameterBinder, ShaderParameters};
use crate::globals::{GlobalName, PublishedGlobals};
use crate::graph::{SlotRef, StageGraph};
use crate::state::PipelineState;

/// Stage name reported when the final copy back to the source fails.
pub const WRITE_BACK_STAGE: &str = "write_back";

// ─── Settings Contract ────────────────────────────────────────────────────────

/// A per-effect settings record the executor can drive.
pub trait EffectSettings: ShaderParameters + Clone {
    /// Value identifying the graph shape. The graph is rebuilt only when it
    /// changes.
    type GraphKey: PartialEq + Clone + std::fmt::Debug;

    /// Raw downsample factor as supplied by the host. Validated by the core.
    fn downsample_factor(&self) -> i32;

    fn graph_key(&self) -> Self::GraphKey;

    fn build_graph(&self) -> Result<StageGraph>;
}

// ─── Frame I/O ────────────────────────────────────────────────────────────────

/// Per-frame input supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInput {
    /// Camera color target. Read by the first stages and overwritten with
    /// the final image.
    pub source: ColorTarget,
    /// Native width as reported by the host (validated).
    pub width: i32,
    /// Native height as reported by the host (validated).
    pub height: i32,
    pub frame: u64,
}

impl FrameInput {
    #[must_use]
    pub fn new(source: ColorTarget, width: i32, height: i32, frame: u64) -> Self {
        Self {
            source,
            width,
            height,
            frame,
        }
    }
}

/// How a frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Every stage ran.
    Completed,
    /// A `HALT_AFTER` stage stopped the walk early.
    Halted { stage: &'static str },
    /// The executor is unconfigured; nothing was recorded.
    Skipped,
}

/// Summary of one successful (or skipped) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub outcome: FrameOutcome,
    pub stages_executed: usize,
    /// Blits issued, including the write-back copy.
    pub blits: usize,
    pub wrote_back: bool,
    pub published: SmallVec<[GlobalName; 4]>,
}

impl FrameReport {
    fn skipped() -> Self {
        Self {
            outcome: FrameOutcome::Skipped,
            stages_executed: 0,
            blits: 0,
            wrote_back: false,
            published: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Skipped)
    }
}

// ─── Executor ─────────────────────────────────────────────────────────────────

/// Stage walk progress, shared between the success and failure paths.
struct Walk {
    report: FrameReport,
    /// Targets published this frame, for retraction on failure.
    published: SmallVec<[(GlobalName, Target); 4]>,
    failure: Option<(&'static str, Option<u32>, BackendError)>,
}

/// Drives one effect's stage graph.
pub struct FrameExecutor<S: EffectSettings> {
    label: String,
    program: Option<ProgramId>,
    material: Option<MaterialInstance>,
    state: PipelineState,
    allocator: ResourceAllocator,
    graph: Option<(S::GraphKey, StageGraph)>,
    frames_executed: u64,
    frames_failed: u64,
}

impl<S: EffectSettings> FrameExecutor<S> {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: None,
            material: None,
            state: PipelineState::Unconfigured,
            allocator: ResourceAllocator::new(),
            graph: None,
            frames_executed: 0,
            frames_failed: 0,
        }
    }

    // ── Configuration ──────────────────────────────────────────────────────

    /// Assigns the shader program and validates it together with `settings`.
    ///
    /// On failure the executor stays (or becomes) [`PipelineState::Unconfigured`]
    /// and every frame is a no-op until validation succeeds.
    pub fn configure(
        &mut self,
        backend: &dyn RenderBackend,
        program: Option<ProgramId>,
        settings: &S,
    ) -> Result<()> {
        if self.program != program {
            self.material = program.map(MaterialInstance::new);
            self.program = program;
        }
        match self.validate(backend, settings) {
            Ok(()) => {
                if self.state == PipelineState::Unconfigured {
                    log::info!("{}: configured with program {:?}", self.label, program);
                }
                self.state = PipelineState::Validated;
                Ok(())
            }
            Err(e) => {
                self.unconfigure(&e);
                Err(e)
            }
        }
    }

    fn validate(&mut self, backend: &dyn RenderBackend, settings: &S) -> Result<()> {
        let program = self.check_program(backend)?;
        nimbus_core::DownsampleFactor::from_raw(settings.downsample_factor())?;
        self.ensure_graph(settings)?;
        if self.material.is_none() {
            self.material = Some(MaterialInstance::new(program));
        }
        Ok(())
    }

    fn check_program(&self, backend: &dyn RenderBackend) -> Result<ProgramId> {
        let Some(program) = self.program else {
            return Err(NimbusError::invalid_config(format!(
                "{}: no shader program assigned",
                self.label
            )));
        };
        if backend.program_pass_count(program).is_none() {
            return Err(NimbusError::invalid_config(format!(
                "{}: shader program {program:?} is not known to the backend",
                self.label
            )));
        }
        Ok(program)
    }

    fn ensure_graph(&mut self, settings: &S) -> Result<()> {
        let key = settings.graph_key();
        if self.graph.as_ref().is_some_and(|(k, _)| *k == key) {
            return Ok(());
        }
        let graph = settings.build_graph()?;
        log::debug!(
            "{}: stage graph '{}' built ({} stages, {} slots)",
            self.label,
            graph.name(),
            graph.len(),
            graph.slots().len()
        );
        self.graph = Some((key, graph));
        Ok(())
    }

    fn unconfigure(&mut self, reason: &NimbusError) {
        if self.state != PipelineState::Unconfigured {
            log::warn!("{}: unconfigured: {reason}", self.label);
        }
        self.state = PipelineState::Unconfigured;
        self.allocator.invalidate();
    }

    // ── Frame ──────────────────────────────────────────────────────────────

    /// Runs one frame.
    ///
    /// Returns a [`FrameOutcome::Skipped`] report while the executor is
    /// unconfigured and validation still fails.
    pub fn execute(
        &mut self,
        backend: &mut dyn RenderBackend,
        globals: &mut PublishedGlobals,
        input: &FrameInput,
        settings: &S,
    ) -> Result<FrameReport> {
        if self.allocator.active_count() > 0 {
            log::warn!(
                "{}: previous frame was not released, releasing now",
                self.label
            );
            self.release(backend);
        }

        if self.state == PipelineState::Unconfigured {
            let revalidated = self
                .validate(backend, settings)
                .and_then(|()| Extent::from_signed(input.width, input.height));
            if let Err(e) = revalidated {
                log::trace!("{}: still unconfigured ({e}), frame skipped", self.label);
                return Ok(FrameReport::skipped());
            }
            log::info!("{}: configuration became valid", self.label);
            self.state = PipelineState::Validated;
        }

        if let Err(e) = self.prepare(backend, input, settings) {
            if e.is_configuration() {
                self.unconfigure(&e);
            }
            return Err(e);
        }

        let Some(program) = self.program else {
            return Err(NimbusError::invalid_config("program lost during frame"));
        };

        // Bind
        let Some(material) = self.material.as_mut() else {
            return Err(NimbusError::invalid_config("material lost during frame"));
        };
        ParameterBinder::bind(material, settings);
        self.state = PipelineState::Bound;
        if let Err(e) = backend.set_uniforms(program, material.uniforms()) {
            log::error!("{}: uniform upload failed: {e}", self.label);
            return Err(self.fail_frame(backend, e.into()));
        }

        // Walk
        let walk = match self.graph.as_ref() {
            Some((_, graph)) => walk_stages(
                graph,
                &self.allocator,
                backend,
                globals,
                program,
                input.source,
            ),
            None => return Err(NimbusError::invalid_config("stage graph missing")),
        };

        let Walk {
            report,
            published,
            failure,
        } = walk;

        if let Some((stage, pass, source)) = failure {
            log::error!(
                "{}: stage '{stage}' (pass {pass:?}) failed: {source}",
                self.label
            );
            for (name, target) in published {
                if globals.retract(name, target) {
                    backend.clear_global_texture(name);
                }
            }
            let program_lost = matches!(source, BackendError::UnknownProgram(_));
            let err = NimbusError::StageExecution {
                feature: self.label.clone(),
                stage,
                pass,
                source,
            };
            let err = self.fail_frame(backend, err);
            if program_lost {
                self.unconfigure(&err);
            }
            return Err(err);
        }

        let submitted = backend.submit();
        backend.clear_commands();
        if let Err(e) = submitted {
            for (name, target) in published {
                globals.retract(name, target);
            }
            log::error!("{}: submit failed: {e}", self.label);
            return Err(self.fail_frame(backend, e.into()));
        }

        self.state = PipelineState::Executed;
        self.frames_executed += 1;
        log::trace!(
            "{}: frame {} executed ({} stages, {} blits)",
            self.label,
            input.frame,
            report.stages_executed,
            report.blits
        );
        Ok(report)
    }

    /// Re-checks the program, refreshes the graph and acquires scratch.
    fn prepare(
        &mut self,
        backend: &mut dyn RenderBackend,
        input: &FrameInput,
        settings: &S,
    ) -> Result<()> {
        self.check_program(backend)?;
        self.ensure_graph(settings)?;
        let Some((_, graph)) = self.graph.as_ref() else {
            return Err(NimbusError::invalid_config("stage graph missing"));
        };
        self.allocator.configure(
            input.width,
            input.height,
            settings.downsample_factor(),
            graph.slots(),
        )?;
        self.allocator.acquire(backend)
    }

    /// Submits what was recorded, clears the recorder, releases scratch.
    fn fail_frame(&mut self, backend: &mut dyn RenderBackend, err: NimbusError) -> NimbusError {
        if let Err(e) = backend.submit() {
            log::error!("{}: submit of partial frame failed: {e}", self.label);
        }
        backend.clear_commands();
        self.release(backend);
        self.frames_failed += 1;
        err
    }

    /// Returns every scratch buffer to the backend. Safe to call at any time,
    /// including for frames the host abandoned.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let released = self.allocator.release_all(backend);
        if self.state != PipelineState::Unconfigured {
            self.state = PipelineState::Released;
        }
        released
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    #[must_use]
    pub fn graph(&self) -> Option<&StageGraph> {
        self.graph.as_ref().map(|(_, g)| g)
    }

    /// Uniforms bound in the most recent frame.
    #[must_use]
    pub fn material(&self) -> Option<&MaterialInstance> {
        self.material.as_ref()
    }

    #[must_use]
    pub fn frames_executed(&self) -> u64 {
        self.frames_executed
    }

    #[must_use]
    pub fn frames_failed(&self) -> u64 {
        self.frames_failed
    }
}

fn resolve(slot: SlotRef, allocator: &ResourceAllocator, source: ColorTarget) -> Option<Target> {
    match slot {
        SlotRef::Source => Some(Target::Source(source)),
        SlotRef::Slot(id) => allocator.handle(id).map(Target::Scratch),
    }
}

fn walk_stages(
    graph: &StageGraph,
    allocator: &ResourceAllocator,
    backend: &mut dyn RenderBackend,
    globals: &mut PublishedGlobals,
    program: ProgramId,
    source: ColorTarget,
) -> Walk {
    let mut walk = Walk {
        report: FrameReport {
            outcome: FrameOutcome::Completed,
            stages_executed: 0,
            blits: 0,
            wrote_back: false,
            published: SmallVec::new(),
        },
        published: SmallVec::new(),
        failure: None,
    };
    let mut last_output = SlotRef::Source;

    for stage in graph.stages() {
        let (Some(src), Some(dst)) = (
            resolve(stage.input, allocator, source),
            resolve(stage.output, allocator, source),
        ) else {
            walk.failure = Some((
                stage.name,
                stage.pass,
                BackendError::Rejected(format!("no scratch buffer bound for '{}'", stage.name)),
            ));
            return walk;
        };

        let pass = stage.pass.map(|index| ShaderPass { program, index });
        if let Err(e) = backend.blit(src, dst, pass) {
            walk.failure = Some((stage.name, stage.pass, e));
            return walk;
        }
        log::trace!("stage '{}': {src:?} -> {dst:?} pass {:?}", stage.name, stage.pass);
        walk.report.blits += 1;
        walk.report.stages_executed += 1;
        last_output = stage.output;

        if let Some(name) = stage.publish {
            backend.set_global_texture(name, dst);
            globals.publish(name, dst, stage.name);
            walk.published.push((name, dst));
            walk.report.published.push(name);
        }

        if stage.halts() {
            walk.report.outcome = FrameOutcome::Halted { stage: stage.name };
            break;
        }
    }

    if last_output != SlotRef::Source {
        let Some(src) = resolve(last_output, allocator, source) else {
            walk.failure = Some((
                WRITE_BACK_STAGE,
                None,
                BackendError::Rejected("no scratch buffer bound for write-back".into()),
            ));
            return walk;
        };
        if let Err(e) = backend.blit(src, Target::Source(source), None) {
            walk.failure = Some((WRITE_BACK_STAGE, None, e));
            return walk;
        }
        walk.report.blits += 1;
        walk.report.wrote_back = true;
    }

    walk
}
