//! Canonical Topologies
//!
//! The raymarch → blur → composite sequence shared by the volumetric effects,
//! in the three shapes selectable through [`DebugStage`]:
//!
//! ```text
//! RaymarchOnly:  source ─► temp ─0─► source ─ halt
//!
//! ThroughBlur:   source ─0─► temp ─1─► low_res ─2─► source
//!
//! Full:          source ─0─► temp ─1─► low_res ─2─► temp      publish _volumetricTexture
//!                source ─4─► low_res                          publish _LowResDepth
//!                source ─3─► composite (samples both globals)
//!                composite ─► (write back) source
//! ```
//!
//! The blur stays split into a horizontal and a vertical pass. Pass indices
//! come from [`CanonicalPasses`] so programs with a different pass layout can
//! reuse the same shapes.

use serde::{Deserialize, Serialize};

use nimbus_core::Result;

use crate::globals::{LOW_RES_DEPTH, VOLUMETRIC_TEXTURE};

use super::slot::{BufferSlot, SlotId};
use super::stage::{SlotRef, Stage};
use super::stage_graph::StageGraph;

/// Debug stage selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStage {
    /// Stop after the raymarch and show its raw output.
    RaymarchOnly,
    /// Raymarch and blur, without the depth-aware composite.
    ThroughBlur,
    /// Production path.
    #[default]
    Full,
}

impl DebugStage {
    pub const ALL: [Self; 3] = [Self::RaymarchOnly, Self::ThroughBlur, Self::Full];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RaymarchOnly => "RaymarchOnly",
            Self::ThroughBlur => "ThroughBlur",
            Self::Full => "Full",
        }
    }
}

/// Shader pass indices of a volumetric program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalPasses {
    pub raymarch: u32,
    pub blur_x: u32,
    pub blur_y: u32,
    pub composite: u32,
    pub depth_downsample: u32,
}

impl Default for CanonicalPasses {
    fn default() -> Self {
        Self {
            raymarch: 0,
            blur_x: 1,
            blur_y: 2,
            composite: 3,
            depth_downsample: 4,
        }
    }
}

/// Downsampled raymarch / blur buffer.
pub const TEMP: SlotId = SlotId(0);
/// Downsampled blur ping-pong buffer, later reused for depth.
pub const LOW_RES: SlotId = SlotId(1);
/// Native-resolution composite target.
pub const COMPOSITE: SlotId = SlotId(2);

/// Builds one of the canonical topologies.
pub fn volumetric_graph(stage: DebugStage, passes: CanonicalPasses) -> Result<StageGraph> {
    match stage {
        DebugStage::RaymarchOnly => raymarch_only(passes),
        DebugStage::ThroughBlur => through_blur(passes),
        DebugStage::Full => full(passes),
    }
}

fn full_slots() -> Vec<BufferSlot> {
    vec![
        BufferSlot::downsampled(TEMP, "temp"),
        BufferSlot::downsampled(LOW_RES, "low_res"),
        BufferSlot::native(COMPOSITE, "composite"),
    ]
}

fn full_stages(passes: CanonicalPasses) -> Vec<Stage> {
    let temp = SlotRef::Slot(TEMP);
    let low_res = SlotRef::Slot(LOW_RES);
    vec![
        Stage::blit("raymarch", SlotRef::Source, temp, passes.raymarch),
        Stage::blit("blur_x", temp, low_res, passes.blur_x),
        Stage::blit("blur_y", low_res, temp, passes.blur_y).publishing(VOLUMETRIC_TEXTURE),
        Stage::blit(
            "depth_downsample",
            SlotRef::Source,
            low_res,
            passes.depth_downsample,
        )
        .publishing(LOW_RES_DEPTH),
        Stage::blit(
            "composite",
            SlotRef::Source,
            SlotRef::Slot(COMPOSITE),
            passes.composite,
        )
        .reading(temp)
        .reading(low_res),
    ]
}

fn full(passes: CanonicalPasses) -> Result<StageGraph> {
    StageGraph::new("Full", full_slots(), full_stages(passes))
}

/// Copies the source aside so the raymarch can overwrite it directly.
fn raymarch_only(passes: CanonicalPasses) -> Result<StageGraph> {
    let temp = SlotRef::Slot(TEMP);
    StageGraph::new(
        "RaymarchOnly",
        vec![BufferSlot::downsampled(TEMP, "temp")],
        vec![
            Stage::copy("copy_source", SlotRef::Source, temp),
            Stage::blit("raymarch", temp, SlotRef::Source, passes.raymarch).halt_after(),
        ],
    )
}

fn through_blur(passes: CanonicalPasses) -> Result<StageGraph> {
    let temp = SlotRef::Slot(TEMP);
    let low_res = SlotRef::Slot(LOW_RES);
    StageGraph::new(
        "ThroughBlur",
        vec![
            BufferSlot::downsampled(TEMP, "temp"),
            BufferSlot::downsampled(LOW_RES, "low_res"),
        ],
        vec![
            Stage::blit("raymarch", SlotRef::Source, temp, passes.raymarch),
            Stage::blit("blur_x", temp, low_res, passes.blur_x),
            Stage::blit("blur_y", low_res, SlotRef::Source, passes.blur_y),
        ],
    )
}
