//! Stage Graph
//!
//! An immutable, validated sequence of [`Stage`]s plus the [`BufferSlot`]s
//! they reference. Validation happens once in [`StageGraph::new`], so the
//! executor can walk the stages without re-checking their wiring every frame.
//!
//! # Rules
//!
//! | Rule | Rejected example |
//! |------|------------------|
//! | At least one stage | `StageGraph::new("x", slots, vec![])` |
//! | Slot ids are unique | two slots declared as `SlotId(0)` |
//! | Every referenced slot is declared | a stage writing an undeclared `SlotId(7)` |
//! | Primary inputs were written earlier (or are the source) | reading `temp` before any stage wrote it |
//! | Extra inputs were published by their last writer | sampling `low_res` that nobody published |
//! | A stage never reads the target it writes | `temp → temp` |
//! | Fractional scales are finite and positive | `Fraction(0.0)` |

use nimbus_core::{NimbusError, Result};
use rustc_hash::FxHashMap;

use super::slot::{BufferSlot, SlotId, SlotScale};
use super::stage::{SlotRef, Stage};

/// A validated stage graph.
#[derive(Debug, Clone)]
pub struct StageGraph {
    name: &'static str,
    slots: Vec<BufferSlot>,
    stages: Vec<Stage>,
}

impl StageGraph {
    /// Validates and builds a graph.
    pub fn new(name: &'static str, slots: Vec<BufferSlot>, stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(NimbusError::invalid_config(format!(
                "stage graph '{name}' has no stages"
            )));
        }

        let mut declared: FxHashMap<SlotId, &'static str> = FxHashMap::default();
        for slot in &slots {
            if let Some(prev) = declared.insert(slot.id, slot.name) {
                return Err(NimbusError::invalid_config(format!(
                    "stage graph '{name}': slot {:?} declared twice ('{prev}' and '{}')",
                    slot.id, slot.name
                )));
            }
            if let SlotScale::Fraction(f) = slot.scale
                && !(f.is_finite() && f > 0.0)
            {
                return Err(NimbusError::invalid_config(format!(
                    "stage graph '{name}': slot '{}' has invalid scale {f}",
                    slot.name
                )));
            }
        }

        // Slot -> index of the stage that last wrote it.
        let mut last_writer: FxHashMap<SlotId, usize> = FxHashMap::default();

        for (index, stage) in stages.iter().enumerate() {
            for input in stage.inputs() {
                if let SlotRef::Slot(id) = input {
                    check_declared(name, stage, id, &declared)?;
                    if !last_writer.contains_key(&id) {
                        return Err(NimbusError::invalid_config(format!(
                            "stage graph '{name}': stage '{}' reads '{}' before it is written",
                            stage.name, declared[&id]
                        )));
                    }
                }
            }

            for extra in &stage.extra_inputs {
                let SlotRef::Slot(id) = extra else {
                    continue;
                };
                let writer = &stages[last_writer[id]];
                if writer.publish.is_none() {
                    return Err(NimbusError::invalid_config(format!(
                        "stage graph '{name}': stage '{}' samples '{}' but stage '{}' does not publish it",
                        stage.name, declared[id], writer.name
                    )));
                }
            }

            if stage.input == stage.output {
                return Err(NimbusError::invalid_config(format!(
                    "stage graph '{name}': stage '{}' reads and writes the same target",
                    stage.name
                )));
            }

            if let SlotRef::Slot(id) = stage.output {
                check_declared(name, stage, id, &declared)?;
                last_writer.insert(id, index);
            }
        }

        Ok(Self {
            name,
            slots,
            stages,
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[BufferSlot] {
        &self.slots
    }

    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn slot(&self, id: SlotId) -> Option<&BufferSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Shader pass indices in execution order (`None` for plain copies).
    #[must_use]
    pub fn pass_sequence(&self) -> Vec<Option<u32>> {
        self.stages.iter().map(|s| s.pass).collect()
    }

    /// Highest shader pass index used by any stage.
    #[must_use]
    pub fn max_pass(&self) -> Option<u32> {
        self.stages.iter().filter_map(|s| s.pass).max()
    }
}

fn check_declared(
    graph: &str,
    stage: &Stage,
    id: SlotId,
    declared: &FxHashMap<SlotId, &'static str>,
) -> Result<()> {
    if declared.contains_key(&id) {
        Ok(())
    } else {
        Err(NimbusError::invalid_config(format!(
            "stage graph '{graph}': stage '{}' references undeclared slot {id:?}",
            stage.name
        )))
    }
}
