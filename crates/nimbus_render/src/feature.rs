//! Render Features
//!
//! A render feature is the host-facing object for one effect: it owns the
//! effect's settings handle, its shader program reference and its
//! [`FrameExecutor`](crate::executor::FrameExecutor). The [`FeatureStack`]
//! runs every registered feature once per frame against one backend, in
//! injection-point order, and owns the frame's [`PublishedGlobals`].
//!
//! # Frame Protocol
//!
//! ```text
//! stack.configure(&backend);                  // after adding or re-pointing features
//! loop {
//!     let summary = stack.run_frame(&mut backend, &input);
//!     // ... host passes that consume published globals ...
//!     stack.end_frame(&mut backend);          // clears globals, releases scratch
//! }
//! ```

use serde::{Deserialize, Serialize};

use nimbus_core::{NimbusError, Result};

use crate::backend::RenderBackend;
use crate::executor::{FrameInput, FrameReport};
use crate::globals::PublishedGlobals;
use crate::state::PipelineState;

/// Where in the host frame a feature runs.
///
/// | Point | Typical Content |
/// |-------|-----------------|
/// | `BeforePostProcessing` | Light shafts that should be tone mapped with the scene |
/// | `AfterPostProcessing` | Volumetrics composited over the final image |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InjectionPoint {
    BeforePostProcessing = 0,
    #[default]
    AfterPostProcessing = 1,
}

impl InjectionPoint {
    /// Numeric index used for sorting.
    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeforePostProcessing => "BeforePostProcessing",
            Self::AfterPostProcessing => "AfterPostProcessing",
        }
    }
}

/// Host-facing effect object.
pub trait RenderFeature {
    fn name(&self) -> &str;

    fn injection_point(&self) -> InjectionPoint;

    /// Validates program and settings. See
    /// [`FrameExecutor::configure`](crate::executor::FrameExecutor::configure).
    fn configure(&mut self, backend: &dyn RenderBackend) -> Result<()>;

    /// Runs one frame with a fresh settings snapshot.
    fn execute(
        &mut self,
        backend: &mut dyn RenderBackend,
        globals: &mut PublishedGlobals,
        input: &FrameInput,
    ) -> Result<FrameReport>;

    /// Returns the feature's scratch buffers. Returns how many were released.
    fn release(&mut self, backend: &mut dyn RenderBackend) -> usize;

    fn state(&self) -> PipelineState;
}

/// Per-feature result of one frame.
#[derive(Debug)]
pub struct FeatureResult {
    pub name: String,
    pub result: Result<FrameReport>,
}

/// Results of one [`FeatureStack::run_frame`] call, in execution order.
#[derive(Debug, Default)]
pub struct FrameSummary {
    pub results: Vec<FeatureResult>,
}

impl FrameSummary {
    /// Features that returned an error this frame.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &NimbusError)> {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.name.as_str(), e)))
    }

    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| r.result.is_ok())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Result<FrameReport>> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.result)
    }
}

struct Entry {
    feature: Box<dyn RenderFeature>,
    /// Insertion sequence (tie-breaker within an injection point).
    order: u32,
}

/// Ordered set of features sharing one backend.
#[derive(Default)]
pub struct FeatureStack {
    entries: Vec<Entry>,
    globals: PublishedGlobals,
    next_order: u32,
    frame_open: bool,
}

impl FeatureStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a feature. Features run grouped by injection point, then in
    /// registration order.
    pub fn add(&mut self, feature: Box<dyn RenderFeature>) {
        log::info!(
            "Feature '{}' added at {}",
            feature.name(),
            feature.injection_point().name()
        );
        self.entries.push(Entry {
            feature,
            order: self.next_order,
        });
        self.next_order += 1;
        self.entries
            .sort_unstable_by_key(|e| (e.feature.injection_point().order(), e.order));
    }

    /// Configures every feature. Features that fail stay unconfigured and
    /// are skipped by later frames until they validate.
    pub fn configure(&mut self, backend: &dyn RenderBackend) -> Vec<(String, NimbusError)> {
        let mut failures = Vec::new();
        for entry in &mut self.entries {
            if let Err(e) = entry.feature.configure(backend) {
                log::warn!("Feature '{}' not configured: {e}", entry.feature.name());
                failures.push((entry.feature.name().to_owned(), e));
            }
        }
        failures
    }

    /// Runs every feature once. A failing feature does not stop the ones
    /// after it.
    pub fn run_frame(&mut self, backend: &mut dyn RenderBackend, input: &FrameInput) -> FrameSummary {
        if self.frame_open {
            log::warn!("run_frame called without end_frame; closing previous frame");
            self.end_frame(backend);
        }
        self.frame_open = true;
        self.globals.begin_frame(input.frame);

        let mut summary = FrameSummary::default();
        for entry in &mut self.entries {
            let result = entry.feature.execute(backend, &mut self.globals, input);
            summary.results.push(FeatureResult {
                name: entry.feature.name().to_owned(),
                result,
            });
        }
        summary
    }

    /// Closes the frame: published globals are cleared first, then every
    /// feature releases its scratch buffers.
    pub fn end_frame(&mut self, backend: &mut dyn RenderBackend) -> usize {
        self.globals.clear();
        let released = self
            .entries
            .iter_mut()
            .map(|e| e.feature.release(backend))
            .sum();
        self.frame_open = false;
        released
    }

    /// Globals published so far in the current frame.
    #[must_use]
    pub fn globals(&self) -> &PublishedGlobals {
        &self.globals
    }

    /// Feature names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.feature.name())
    }

    #[must_use]
    pub fn state_of(&self, name: &str) -> Option<PipelineState> {
        self.entries
            .iter()
            .find(|e| e.feature.name() == name)
            .map(|e| e.feature.state())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
