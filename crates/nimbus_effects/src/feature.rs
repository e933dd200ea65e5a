//! Effect feature wrapper.
//!
//! [`EffectFeature`] binds a [`SharedSettings`] cell, a shader program and a
//! [`FrameExecutor`] into a [`RenderFeature`] the host registers on a
//! [`FeatureStack`](nimbus_render::FeatureStack). Settings are snapshotted
//! exactly once per frame.

use nimbus_core::{ProgramId, Result, SharedSettings};
use nimbus_render::{
    EffectSettings, FrameExecutor, FrameInput, FrameReport, InjectionPoint, PipelineState,
    PublishedGlobals, RenderBackend, RenderFeature,
};

pub struct EffectFeature<S: EffectSettings> {
    name: String,
    injection: InjectionPoint,
    settings: SharedSettings<S>,
    program: Option<ProgramId>,
    executor: FrameExecutor<S>,
}

impl<S: EffectSettings> EffectFeature<S> {
    #[must_use]
    pub fn new(name: impl Into<String>, settings: SharedSettings<S>, injection: InjectionPoint) -> Self {
        let name = name.into();
        Self {
            executor: FrameExecutor::new(name.clone()),
            name,
            injection,
            settings,
            program: None,
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: Option<ProgramId>) -> Self {
        self.program = program;
        self
    }

    /// Re-points the feature at another program. Takes effect on the next
    /// [`configure`](RenderFeature::configure).
    pub fn set_program(&mut self, program: Option<ProgramId>) {
        self.program = program;
    }

    #[must_use]
    pub fn settings(&self) -> &SharedSettings<S> {
        &self.settings
    }

    #[must_use]
    pub fn executor(&self) -> &FrameExecutor<S> {
        &self.executor
    }
}

impl<S: EffectSettings> RenderFeature for EffectFeature<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn injection_point(&self) -> InjectionPoint {
        self.injection
    }

    fn configure(&mut self, backend: &dyn RenderBackend) -> Result<()> {
        let snapshot = self.settings.snapshot();
        self.executor.configure(backend, self.program, &snapshot)
    }

    fn execute(
        &mut self,
        backend: &mut dyn RenderBackend,
        globals: &mut PublishedGlobals,
        input: &FrameInput,
    ) -> Result<FrameReport> {
        let snapshot = self.settings.snapshot();
        self.executor.execute(backend, globals, input, &snapshot)
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) -> usize {
        self.executor.release(backend)
    }

    fn state(&self) -> PipelineState {
        self.executor.state()
    }
}
