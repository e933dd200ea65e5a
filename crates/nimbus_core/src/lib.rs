//! Nimbus Core
//!
//! Foundational types shared by every Nimbus crate:
//!
//! - [`errors`]: the [`NimbusError`] taxonomy and the [`Result`] alias
//! - [`extent`]: validated render-target dimensions and downsample factors
//! - [`handles`]: opaque identifiers for host-owned and backend-owned objects
//! - [`settings`]: the cross-frame settings cell and JSON loading helpers

pub mod errors;
pub mod extent;
pub mod handles;
pub mod settings;

pub use errors::{BackendError, NimbusError, Result};
pub use extent::{DownsampleFactor, Extent};
pub use handles::{ColorTarget, ProgramId, ScratchHandle, TextureId};
pub use settings::SharedSettings;
