//! Phase function parameters.
//!
//! The cloud raymarch shader blends a forward- and a back-scattering lobe.
//! Its four coefficients travel to the GPU packed into one `vec4`:
//!
//! | Lane | Parameter |
//! |------|-----------|
//! | `x` | back-scattering |
//! | `y` | front-scattering |
//! | `z` | base brightness |
//! | `w` | intensity |
//!
//! The values are derived from the lighting settings on every bind and never
//! stored back into them.

use glam::Vec4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseParameters {
    pub back_scattering: f32,
    pub front_scattering: f32,
    pub base_brightness: f32,
    pub intensity: f32,
}

impl PhaseParameters {
    #[must_use]
    pub const fn new(
        back_scattering: f32,
        front_scattering: f32,
        base_brightness: f32,
        intensity: f32,
    ) -> Self {
        Self {
            back_scattering,
            front_scattering,
            base_brightness,
            intensity,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            self.back_scattering,
            self.front_scattering,
            self.base_brightness,
            self.intensity,
        )
    }
}

impl From<PhaseParameters> for Vec4 {
    fn from(p: PhaseParameters) -> Self {
        p.to_vec4()
    }
}
