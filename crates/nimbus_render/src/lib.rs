//! Nimbus Render
//!
//! The multi-stage off-screen composition pipeline:
//!
//! - [`backend`]: the [`RenderBackend`] seam to the host renderer
//! - [`graph`]: buffer slots, stages and the canonical topologies
//! - [`allocator`]: resolution-scaled scratch planning and frame-scoped lifetime
//! - [`binder`]: static settings → uniform tables
//! - [`executor`]: the per-frame driver and its state machine
//! - [`globals`]: frame-scoped published buffers
//! - [`feature`]: host-facing features and the feature stack

pub mod allocator;
pub mod backend;
pub mod binder;
pub mod executor;
pub mod feature;
pub mod globals;
pub mod graph;
pub mod state;

pub use allocator::{AllocationPlan, PlannedBuffer, ResourceAllocator};
pub use backend::{RenderBackend, SCRATCH_USAGE, ScratchDesc, ShaderPass, Target};
pub use binder::{
    IntoUniform, MaterialInstance, ParameterBinder, ShaderParameters, UniformBlock, UniformName,
    UniformValue,
};
pub use executor::{
    EffectSettings, FrameExecutor, FrameInput, FrameOutcome, FrameReport, WRITE_BACK_STAGE,
};
pub use feature::{FeatureResult, FeatureStack, FrameSummary, InjectionPoint, RenderFeature};
pub use globals::{GlobalName, LOW_RES_DEPTH, PublishedGlobals, VOLUMETRIC_TEXTURE};
pub use graph::{
    BufferSlot, CanonicalPasses, DebugStage, SlotId, SlotRef, SlotScale, Stage, StageFlags,
    StageGraph, volumetric_graph,
};
pub use state::PipelineState;
