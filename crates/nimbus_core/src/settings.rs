//! Settings storage shared between the configuration layer and the pipeline.
//!
//! Effect settings may be edited at any time (inspector sliders, scripts,
//! hot-reloaded files) while frames are being produced. The pipeline must
//! never observe a half-applied edit, so it reads settings exactly once per
//! frame through [`SharedSettings::snapshot`] and works on that copy.
//!
//! # Example
//!
//! ```rust,ignore
//! let settings = SharedSettings::new(VolumetricLightSettings::default());
//!
//! // Configuration layer (any time between frames)
//! settings.update(|s| s.intensity = 2.0);
//!
//! // Pipeline (once per frame)
//! let snapshot = settings.snapshot();
//! ```

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::errors::Result;

/// Cloneable handle to a settings record shared across frames.
#[derive(Debug, Default)]
pub struct SharedSettings<S> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for SharedSettings<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Clone> SharedSettings<S> {
    #[must_use]
    pub fn new(settings: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Returns a consistent copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> S {
        self.inner.read().clone()
    }

    /// Applies an edit atomically with respect to [`snapshot`](Self::snapshot).
    pub fn update(&self, edit: impl FnOnce(&mut S)) {
        edit(&mut self.inner.write());
    }

    /// Replaces the whole record.
    pub fn replace(&self, settings: S) {
        *self.inner.write() = settings;
    }
}

/// Parses a settings record from a JSON string.
pub fn from_json_str<S: DeserializeOwned>(json: &str) -> Result<S> {
    Ok(serde_json::from_str(json)?)
}

/// Loads a settings record from a JSON file.
pub fn load_json<S: DeserializeOwned>(path: impl AsRef<Path>) -> Result<S> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let settings = from_json_str(&text)?;
    log::info!("Loaded settings from {}", path.display());
    Ok(settings)
}
