//! Stage Graph
//!
//! Declarative description of an effect's blit sequence.
//!
//! - [`slot`]: intermediate buffer declarations
//! - [`stage`]: individual blits
//! - [`stage_graph`]: the validated sequence
//! - [`topology`]: the canonical volumetric shapes

pub mod slot;
pub mod stage;
pub mod stage_graph;
pub mod topology;

pub use slot::{BufferSlot, DEFAULT_SLOT_FORMAT, SlotId, SlotScale};
pub use stage::{SlotRef, Stage, StageFlags};
pub use stage_graph::StageGraph;
pub use topology::{CanonicalPasses, DebugStage, volumetric_graph};
