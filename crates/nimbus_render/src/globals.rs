//! Published Globals
//!
//! Some intermediate buffers are useful to passes that have nothing to do
//! with the effect that produced them: a fog pass may want the volumetric
//! lighting result, an upsampler may want the low-resolution depth. Instead
//! of wiring those consumers to a producer's stage slots, producers publish a
//! buffer under a well-known [`GlobalName`] and consumers look it up by name.
//!
//! # Contract
//!
//! - **Last writer wins**: publishing an existing name replaces the entry.
//! - **Frame-scoped**: entries are valid only within the frame that published
//!   them. [`PublishedGlobals::clear`] runs at frame end, before the backing
//!   scratch buffers are released.
//! - Consumers look entries up every frame and never cache the returned
//!   [`Target`].

use std::fmt;

use rustc_hash::FxHashMap;

use crate::backend::Target;

/// Name under which a buffer is exposed to other passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalName(&'static str);

impl GlobalName {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for GlobalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Blurred volumetric lighting result.
pub const VOLUMETRIC_TEXTURE: GlobalName = GlobalName::new("_volumetricTexture");

/// Scene depth downsampled to the effect resolution.
pub const LOW_RES_DEPTH: GlobalName = GlobalName::new("_LowResDepth");

#[derive(Debug, Clone, Copy)]
struct Entry {
    target: Target,
    publisher: &'static str,
}

/// Frame-scoped name → target registry.
#[derive(Debug, Default)]
pub struct PublishedGlobals {
    entries: FxHashMap<GlobalName, Entry>,
    frame: u64,
}

impl PublishedGlobals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame. Entries left over from a previous frame are
    /// dropped.
    pub fn begin_frame(&mut self, frame: u64) {
        if self.frame != frame && !self.entries.is_empty() {
            log::warn!(
                "Dropping {} published globals left over from frame {}",
                self.entries.len(),
                self.frame
            );
            self.entries.clear();
        }
        self.frame = frame;
    }

    /// Publishes `target` under `name`, replacing any earlier entry.
    pub fn publish(&mut self, name: GlobalName, target: Target, publisher: &'static str) {
        if let Some(prev) = self.entries.insert(name, Entry { target, publisher }) {
            log::trace!(
                "Global '{}' from '{}' replaced by '{}'",
                name,
                prev.publisher,
                publisher
            );
        }
    }

    /// Removes `name` if it still points at `target`. Used when a producer
    /// releases its buffers before the frame ends.
    pub fn retract(&mut self, name: GlobalName, target: Target) -> bool {
        if self.lookup(name) == Some(target) {
            self.entries.remove(&name);
            true
        } else {
            false
        }
    }

    /// Looks up a published buffer for the current frame.
    #[must_use]
    pub fn lookup(&self, name: GlobalName) -> Option<Target> {
        self.entries.get(&name).map(|e| e.target)
    }

    /// Returns the stage that last published `name`.
    #[must_use]
    pub fn publisher(&self, name: GlobalName) -> Option<&'static str> {
        self.entries.get(&name).map(|e| e.publisher)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Drops every entry. Called at frame end.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
