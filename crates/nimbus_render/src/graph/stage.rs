//! Stage Definitions
//!
//! A [`Stage`] is one blit in an effect's composition sequence: read a primary
//! input, optionally run a shader pass, write one output. Stages may also
//! sample buffers published by earlier stages and may publish their own
//! output under a global name.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::globals::GlobalName;

use super::slot::SlotId;

/// A stage endpoint: the frame's source color target or a declared slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotRef {
    Source,
    Slot(SlotId),
}

bitflags! {
    /// Per-stage behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StageFlags: u8 {
        /// Stop walking the graph after this stage and write its output back
        /// to the source (debug inspection of intermediate results).
        const HALT_AFTER = 1 << 0;
    }
}

/// One step of a stage graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: &'static str,
    /// Blit source.
    pub input: SlotRef,
    /// Buffers sampled by the shader through published globals.
    pub extra_inputs: SmallVec<[SlotRef; 2]>,
    pub output: SlotRef,
    /// Shader pass index; `None` is a plain copy.
    pub pass: Option<u32>,
    /// Global name the output is published under after the blit.
    pub publish: Option<GlobalName>,
    pub flags: StageFlags,
}

impl Stage {
    /// A plain copy from `input` to `output`.
    #[must_use]
    pub fn copy(name: &'static str, input: SlotRef, output: SlotRef) -> Self {
        Self {
            name,
            input,
            extra_inputs: SmallVec::new(),
            output,
            pass: None,
            publish: None,
            flags: StageFlags::empty(),
        }
    }

    /// A blit through shader pass `pass`.
    #[must_use]
    pub fn blit(name: &'static str, input: SlotRef, output: SlotRef, pass: u32) -> Self {
        Self {
            pass: Some(pass),
            ..Self::copy(name, input, output)
        }
    }

    /// Declares an additional sampled input.
    #[must_use]
    pub fn reading(mut self, input: SlotRef) -> Self {
        self.extra_inputs.push(input);
        self
    }

    /// Publishes the output under `name` once the blit is recorded.
    #[must_use]
    pub fn publishing(mut self, name: GlobalName) -> Self {
        self.publish = Some(name);
        self
    }

    #[must_use]
    pub fn halt_after(mut self) -> Self {
        self.flags |= StageFlags::HALT_AFTER;
        self
    }

    #[inline]
    #[must_use]
    pub fn halts(&self) -> bool {
        self.flags.contains(StageFlags::HALT_AFTER)
    }

    /// All inputs, primary first.
    pub fn inputs(&self) -> impl Iterator<Item = SlotRef> + '_ {
        std::iter::once(self.input).chain(self.extra_inputs.iter().copied())
    }
}
