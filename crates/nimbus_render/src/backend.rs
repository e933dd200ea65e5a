//! Render Backend Abstraction
//!
//! The pipeline core never talks to a graphics API directly. Everything it
//! needs from the host renderer goes through [`RenderBackend`]:
//!
//! ```text
//! ┌──────────────────────┐        ┌────────────────────────────────┐
//! │   FrameExecutor      │        │   RenderBackend (host)         │
//! │                      │        │                                │
//! │  acquire / release ──┼──────► │  scratch render targets        │
//! │  set_uniforms      ──┼──────► │  material uniform storage      │
//! │  blit / set_global ──┼──────► │  command recorder (ordered)    │
//! │  clear_global      ──┼──────► │                                │
//! │  submit / clear    ──┼──────► │  queue submission              │
//! └──────────────────────┘        └────────────────────────────────┘
//! ```
//!
//! Commands are recorded in call order and only reach the GPU on
//! [`submit`](RenderBackend::submit). The executor always follows a submit
//! with [`clear_commands`](RenderBackend::clear_commands), including on
//! failed frames, so the recorder never carries state across frames.

use nimbus_core::{BackendError, ColorTarget, ProgramId, ScratchHandle};

use crate::binder::UniformBlock;
use crate::globals::GlobalName;

/// Texture usages every scratch buffer is created with: it is rendered into
/// by one blit and sampled by a later one.
pub const SCRATCH_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING);

/// A blit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The camera's primary color target for this frame.
    Source(ColorTarget),
    /// A frame-scoped scratch buffer.
    Scratch(ScratchHandle),
}

/// A shader program pass to run during a blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderPass {
    pub program: ProgramId,
    pub index: u32,
}

/// Descriptor for a scratch buffer request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScratchDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    /// Always 1: intermediate buffers never need an anti-aliasing resolve.
    pub sample_count: u32,
}

/// Host rendering backend.
///
/// Implementations record commands in call order. They are driven from a
/// single render thread once per camera per frame.
pub trait RenderBackend {
    /// Returns the number of passes of a known program, or `None` if the
    /// program reference is not (or no longer) valid.
    fn program_pass_count(&self, program: ProgramId) -> Option<u32>;

    /// Requests a scratch render target for the current frame.
    fn acquire_scratch(&mut self, desc: &ScratchDesc) -> Result<ScratchHandle, BackendError>;

    /// Returns a scratch render target. Releasing an unknown handle is a
    /// no-op for the backend.
    fn release_scratch(&mut self, handle: ScratchHandle);

    /// Uploads the uniform values used by subsequent blits with `program`.
    fn set_uniforms(&mut self, program: ProgramId, uniforms: &UniformBlock)
    -> Result<(), BackendError>;

    /// Records a blit from `src` to `dst`, optionally through a shader pass.
    /// Without a pass this is a plain copy.
    fn blit(
        &mut self,
        src: Target,
        dst: Target,
        pass: Option<ShaderPass>,
    ) -> Result<(), BackendError>;

    /// Records binding `target` to a global texture name visible to every
    /// later command in the frame.
    fn set_global_texture(&mut self, name: GlobalName, target: Target);

    /// Records unbinding a global texture name.
    fn clear_global_texture(&mut self, name: GlobalName);

    /// Submits all recorded commands.
    fn submit(&mut self) -> Result<(), BackendError>;

    /// Drops any recorded, unsubmitted commands.
    fn clear_commands(&mut self);
}
