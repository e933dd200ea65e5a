//! Scratch Resource Allocator
//!
//! Turns a graph's [`BufferSlot`] declarations into concrete scratch buffer
//! descriptors for the current camera resolution, and owns the lifetime of
//! the backend handles acquired for them.
//!
//! # Frame Lifecycle
//!
//! ```text
//! configure(w, h, factor, slots) ──► AllocationPlan   (cached until inputs change)
//!          │
//! acquire(backend)                ──► one handle per planned slot
//!          │                          (all-or-nothing: partial acquisitions
//!          │                           are rolled back before returning)
//! handle(slot)                    ──► ScratchHandle   (executor, this frame only)
//!          │
//! release_all(backend)            ──► every active handle returned
//! ```
//!
//! Handles that are still active when the next [`acquire`](ResourceAllocator::acquire)
//! starts belong to a frame the host aborted; they are released first.

use nimbus_core::{DownsampleFactor, Extent, NimbusError, Result, ScratchHandle};

use crate::backend::{RenderBackend, SCRATCH_USAGE, ScratchDesc};
use crate::graph::{BufferSlot, SlotId};

// ─── Plan ─────────────────────────────────────────────────────────────────────

/// A resolved scratch buffer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBuffer {
    pub slot: SlotId,
    pub desc: ScratchDesc,
}

/// Resolved descriptors for one (resolution, factor, slot set) combination.
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    native: Extent,
    factor: DownsampleFactor,
    slots: Vec<BufferSlot>,
    buffers: Vec<PlannedBuffer>,
}

impl AllocationPlan {
    fn build(native: Extent, factor: DownsampleFactor, slots: &[BufferSlot]) -> Result<Self> {
        let buffers = slots
            .iter()
            .map(|slot| {
                let extent = slot.resolve_extent(native, factor)?;
                Ok(PlannedBuffer {
                    slot: slot.id,
                    desc: ScratchDesc {
                        label: slot.name,
                        width: extent.width,
                        height: extent.height,
                        format: slot.format,
                        usage: SCRATCH_USAGE,
                        sample_count: slot.sample_count(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            native,
            factor,
            slots: slots.to_vec(),
            buffers,
        })
    }

    fn matches(&self, native: Extent, factor: DownsampleFactor, slots: &[BufferSlot]) -> bool {
        self.native == native && self.factor == factor && self.slots == slots
    }

    #[inline]
    #[must_use]
    pub fn native(&self) -> Extent {
        self.native
    }

    #[inline]
    #[must_use]
    pub fn factor(&self) -> DownsampleFactor {
        self.factor
    }

    #[inline]
    #[must_use]
    pub fn buffers(&self) -> &[PlannedBuffer] {
        &self.buffers
    }

    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&PlannedBuffer> {
        self.buffers.iter().find(|b| b.slot == slot)
    }
}

// ─── Allocator ────────────────────────────────────────────────────────────────

/// Sole owner of scratch buffer lifetime.
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    plan: Option<AllocationPlan>,
    active: Vec<(SlotId, ScratchHandle)>,
    acquired_total: u64,
    released_total: u64,
    plan_builds: u64,
}

impl ResourceAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the host inputs and returns the allocation plan for them.
    ///
    /// The previous plan is reused when nothing changed. On error the cached
    /// plan is dropped, so a later [`acquire`](Self::acquire) cannot run
    /// against stale dimensions.
    pub fn configure(
        &mut self,
        native_width: i32,
        native_height: i32,
        downsample_factor: i32,
        slots: &[BufferSlot],
    ) -> Result<&AllocationPlan> {
        let validated = Extent::from_signed(native_width, native_height).and_then(|native| {
            DownsampleFactor::from_raw(downsample_factor).map(|factor| (native, factor))
        });
        let (native, factor) = match validated {
            Ok(v) => v,
            Err(e) => {
                self.plan = None;
                return Err(e);
            }
        };

        let reuse = self
            .plan
            .as_ref()
            .is_some_and(|plan| plan.matches(native, factor, slots));

        if !reuse {
            let plan = match AllocationPlan::build(native, factor, slots) {
                Ok(plan) => plan,
                Err(e) => {
                    self.plan = None;
                    return Err(e);
                }
            };
            self.plan_builds += 1;
            log::debug!(
                "Scratch plan rebuilt: native {native}, factor {}, {} buffers",
                factor.divisor(),
                plan.buffers.len()
            );
            self.plan = Some(plan);
        }

        self.plan
            .as_ref()
            .ok_or_else(|| NimbusError::invalid_config("allocation plan missing after configure"))
    }

    /// Acquires one scratch buffer per planned slot.
    ///
    /// Either every planned buffer is acquired or none is: when the backend
    /// refuses a request, the buffers already obtained are released before
    /// the error is returned.
    pub fn acquire(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        if !self.active.is_empty() {
            log::warn!(
                "Releasing {} scratch buffers left over from an aborted frame",
                self.active.len()
            );
            self.release_all(backend);
        }

        let requests = match self.plan.as_ref() {
            Some(plan) => plan.buffers.clone(),
            None => {
                return Err(NimbusError::invalid_config(
                    "scratch acquisition requested before configure",
                ));
            }
        };

        for planned in &requests {
            match backend.acquire_scratch(&planned.desc) {
                Ok(handle) => {
                    self.acquired_total += 1;
                    self.active.push((planned.slot, handle));
                }
                Err(e) => {
                    log::warn!(
                        "Scratch acquisition for '{}' ({}x{}) failed: {e}",
                        planned.desc.label,
                        planned.desc.width,
                        planned.desc.height
                    );
                    self.release_all(backend);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Returns the handle acquired for `slot` in the current frame.
    #[must_use]
    pub fn handle(&self, slot: SlotId) -> Option<ScratchHandle> {
        self.active
            .iter()
            .find_map(|&(id, handle)| (id == slot).then_some(handle))
    }

    /// Returns every active handle to the backend. Returns how many were
    /// released.
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let count = self.active.len();
        for (_, handle) in self.active.drain(..) {
            backend.release_scratch(handle);
        }
        self.released_total += count as u64;
        count
    }

    /// Drops the cached plan. The next [`configure`](Self::configure)
    /// rebuilds it.
    pub fn invalidate(&mut self) {
        self.plan = None;
    }

    #[inline]
    #[must_use]
    pub fn plan(&self) -> Option<&AllocationPlan> {
        self.plan.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[inline]
    #[must_use]
    pub fn acquired_total(&self) -> u64 {
        self.acquired_total
    }

    #[inline]
    #[must_use]
    pub fn released_total(&self) -> u64 {
        self.released_total
    }

    /// Number of times a plan was (re)built.
    #[inline]
    #[must_use]
    pub fn plan_builds(&self) -> u64 {
        self.plan_builds
    }
}
