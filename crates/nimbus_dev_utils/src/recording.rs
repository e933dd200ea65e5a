//! Recording Backend
//!
//! A [`RenderBackend`] that performs no GPU work. It records every command in
//! call order, validates what a real backend would validate (program
//! existence, pass indices, scratch handle liveness), counts resource
//! traffic, and can be told to fail on demand.
//!
//! ```rust,ignore
//! let mut backend = RecordingBackend::new();
//! let program = backend.register_program(5);
//! backend.fail_pass(2);
//!
//! // ... run a frame ...
//!
//! assert_eq!(backend.acquire_count(), backend.release_count());
//! for cmd in backend.submitted() {
//!     println!("{cmd}");
//! }
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use slotmap::{Key, KeyData, SlotMap, new_key_type};

use nimbus_core::{BackendError, ProgramId, ScratchHandle};
use nimbus_render::{GlobalName, RenderBackend, ScratchDesc, ShaderPass, Target, UniformBlock};

new_key_type! {
    struct ScratchKey;
}

fn to_handle(key: ScratchKey) -> ScratchHandle {
    ScratchHandle::from_raw(key.data().as_ffi())
}

fn to_key(handle: ScratchHandle) -> ScratchKey {
    ScratchKey::from(KeyData::from_ffi(handle.to_raw()))
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// A recorded backend command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetUniforms {
        program: ProgramId,
        uniforms: UniformBlock,
    },
    Blit {
        src: Target,
        dst: Target,
        pass: Option<ShaderPass>,
    },
    SetGlobal {
        name: GlobalName,
        target: Target,
    },
    ClearGlobal {
        name: GlobalName,
    },
}

impl Command {
    #[must_use]
    pub fn is_blit(&self) -> bool {
        matches!(self, Self::Blit { .. })
    }
}

struct TargetDisplay(Target);

impl fmt::Display for TargetDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Target::Source(c) => write!(f, "source#{}", c.0),
            Target::Scratch(h) => write!(f, "scratch#{:x}", h.to_raw()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetUniforms { program, uniforms } => {
                write!(f, "set_uniforms  program {} ({} values)", program.0, uniforms.len())
            }
            Self::Blit { src, dst, pass } => {
                write!(f, "blit          {} -> {}", TargetDisplay(*src), TargetDisplay(*dst))?;
                match pass {
                    Some(p) => write!(f, "  pass {}", p.index),
                    None => f.write_str("  copy"),
                }
            }
            Self::SetGlobal { name, target } => {
                write!(f, "set_global    {name} = {}", TargetDisplay(*target))
            }
            Self::ClearGlobal { name } => write!(f, "clear_global  {name}"),
        }
    }
}

// ─── Faults ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    /// Reject every blit through this pass index.
    pass: Option<u32>,
    /// Reject the n-th blit (0-based) counted from when the fault was set.
    nth_blit: Option<usize>,
    /// Refuse acquisitions once this many succeeded since the fault was set.
    acquire_after: Option<usize>,
    submit: bool,
}

// ─── Backend ──────────────────────────────────────────────────────────────────

/// In-memory [`RenderBackend`] for tests and tooling.
#[derive(Default)]
pub struct RecordingBackend {
    programs: FxHashMap<ProgramId, u32>,
    next_program: u32,
    scratch: SlotMap<ScratchKey, ScratchDesc>,
    pending: Vec<Command>,
    submitted: Vec<Command>,
    acquired_descs: Vec<ScratchDesc>,
    last_uniforms: FxHashMap<ProgramId, UniformBlock>,
    faults: Faults,
    blits_since_fault: usize,
    acquires_since_fault: usize,
    acquire_count: usize,
    release_count: usize,
    submit_count: usize,
    clear_count: usize,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Programs ───────────────────────────────────────────────────────────

    /// Registers a shader program with `pass_count` passes.
    pub fn register_program(&mut self, pass_count: u32) -> ProgramId {
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(id, pass_count);
        id
    }

    /// Forgets a program, as if its shader was unloaded.
    pub fn remove_program(&mut self, program: ProgramId) -> bool {
        self.programs.remove(&program).is_some()
    }

    // ── Fault injection ────────────────────────────────────────────────────

    /// Rejects every blit through shader pass `pass`.
    pub fn fail_pass(&mut self, pass: u32) {
        self.faults.pass = Some(pass);
    }

    /// Rejects the `n`-th blit (0-based) from now on.
    pub fn fail_nth_blit(&mut self, n: usize) {
        self.faults.nth_blit = Some(n);
        self.blits_since_fault = 0;
    }

    /// Refuses scratch acquisitions once `n` more have succeeded.
    pub fn fail_acquire_after(&mut self, n: usize) {
        self.faults.acquire_after = Some(n);
        self.acquires_since_fault = 0;
    }

    /// Makes every `submit` fail.
    pub fn fail_submit(&mut self, fail: bool) {
        self.faults.submit = fail;
    }

    pub fn clear_faults(&mut self) {
        self.faults = Faults::default();
    }

    // ── Inspection ─────────────────────────────────────────────────────────

    /// Commands that reached `submit`, in order, across all frames.
    #[must_use]
    pub fn submitted(&self) -> &[Command] {
        &self.submitted
    }

    /// Takes the submitted command log, leaving it empty.
    pub fn take_submitted(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.submitted)
    }

    /// Commands recorded but not yet submitted or cleared.
    #[must_use]
    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    /// Submitted blits as `(src, dst, pass index)`.
    #[must_use]
    pub fn submitted_blits(&self) -> Vec<(Target, Target, Option<u32>)> {
        self.submitted
            .iter()
            .filter_map(|c| match c {
                Command::Blit { src, dst, pass } => Some((*src, *dst, pass.map(|p| p.index))),
                _ => None,
            })
            .collect()
    }

    /// Submitted global bindings, in order.
    #[must_use]
    pub fn submitted_globals(&self) -> Vec<GlobalName> {
        self.submitted
            .iter()
            .filter_map(|c| match c {
                Command::SetGlobal { name, .. } => Some(*name),
                _ => None,
            })
            .collect()
    }

    /// Target bound to `name` after replaying every submitted global
    /// binding, or `None` if it was never bound or has been cleared.
    #[must_use]
    pub fn bound_global(&self, name: GlobalName) -> Option<Target> {
        self.submitted.iter().fold(None, |bound, c| match c {
            Command::SetGlobal { name: n, target } if *n == name => Some(*target),
            Command::ClearGlobal { name: n } if *n == name => None,
            _ => bound,
        })
    }

    /// Descriptor of a live scratch buffer.
    #[must_use]
    pub fn scratch_desc(&self, handle: ScratchHandle) -> Option<&ScratchDesc> {
        self.scratch.get(to_key(handle))
    }

    /// Every descriptor ever acquired, in order.
    #[must_use]
    pub fn acquired_descs(&self) -> &[ScratchDesc] {
        &self.acquired_descs
    }

    #[must_use]
    pub fn last_uniforms(&self, program: ProgramId) -> Option<&UniformBlock> {
        self.last_uniforms.get(&program)
    }

    #[must_use]
    pub fn live_scratch(&self) -> usize {
        self.scratch.len()
    }

    #[must_use]
    pub fn acquire_count(&self) -> usize {
        self.acquire_count
    }

    #[must_use]
    pub fn release_count(&self) -> usize {
        self.release_count
    }

    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.submit_count
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clear_count
    }

    fn check_target(&self, target: Target) -> Result<(), BackendError> {
        match target {
            Target::Scratch(h) if !self.scratch.contains_key(to_key(h)) => {
                Err(BackendError::StaleHandle(h))
            }
            _ => Ok(()),
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn program_pass_count(&self, program: ProgramId) -> Option<u32> {
        self.programs.get(&program).copied()
    }

    fn acquire_scratch(&mut self, desc: &ScratchDesc) -> Result<ScratchHandle, BackendError> {
        if let Some(limit) = self.faults.acquire_after
            && self.acquires_since_fault >= limit
        {
            return Err(BackendError::OutOfMemory(format!(
                "injected failure for '{}' ({}x{})",
                desc.label, desc.width, desc.height
            )));
        }
        self.acquires_since_fault += 1;
        self.acquire_count += 1;
        self.acquired_descs.push(desc.clone());
        let key = self.scratch.insert(desc.clone());
        Ok(to_handle(key))
    }

    fn release_scratch(&mut self, handle: ScratchHandle) {
        if self.scratch.remove(to_key(handle)).is_some() {
            self.release_count += 1;
        } else {
            log::warn!("release of unknown scratch handle {handle:?}");
        }
    }

    fn set_uniforms(
        &mut self,
        program: ProgramId,
        uniforms: &UniformBlock,
    ) -> Result<(), BackendError> {
        if !self.programs.contains_key(&program) {
            return Err(BackendError::UnknownProgram(program));
        }
        self.last_uniforms.insert(program, uniforms.clone());
        self.pending.push(Command::SetUniforms {
            program,
            uniforms: uniforms.clone(),
        });
        Ok(())
    }

    fn blit(
        &mut self,
        src: Target,
        dst: Target,
        pass: Option<ShaderPass>,
    ) -> Result<(), BackendError> {
        let attempt = self.blits_since_fault;
        self.blits_since_fault += 1;

        self.check_target(src)?;
        self.check_target(dst)?;

        if let Some(p) = pass {
            let Some(&pass_count) = self.programs.get(&p.program) else {
                return Err(BackendError::UnknownProgram(p.program));
            };
            if p.index >= pass_count {
                return Err(BackendError::InvalidPass {
                    program: p.program,
                    pass: p.index,
                    pass_count,
                });
            }
            if self.faults.pass == Some(p.index) {
                return Err(BackendError::Rejected(format!(
                    "injected failure for pass {}",
                    p.index
                )));
            }
        }
        if self.faults.nth_blit == Some(attempt) {
            return Err(BackendError::Rejected(format!(
                "injected failure for blit #{attempt}"
            )));
        }

        self.pending.push(Command::Blit { src, dst, pass });
        Ok(())
    }

    fn set_global_texture(&mut self, name: GlobalName, target: Target) {
        self.pending.push(Command::SetGlobal { name, target });
    }

    fn clear_global_texture(&mut self, name: GlobalName) {
        self.pending.push(Command::ClearGlobal { name });
    }

    fn submit(&mut self) -> Result<(), BackendError> {
        if self.faults.submit {
            return Err(BackendError::Rejected("injected submit failure".into()));
        }
        self.submit_count += 1;
        self.submitted.append(&mut self.pending);
        Ok(())
    }

    fn clear_commands(&mut self) {
        self.clear_count += 1;
        self.pending.clear();
    }
}
