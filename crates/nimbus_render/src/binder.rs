//! Parameter Binding
//!
//! Projects a typed settings record onto named shader uniforms.
//!
//! Every effect declares its mapping once with [`uniform_table!`]. The table
//! is ordinary Rust code: a misspelled settings field is a compile error, and
//! uniform names are typed [`UniformName`] constants rather than strings
//! scattered through the pipeline.
//!
//! ```rust,ignore
//! pub const SCATTERING: UniformName = UniformName::new("_Scattering");
//! pub const TINT: UniformName = UniformName::new("_Tint");
//!
//! uniform_table! {
//!     MySettings => |s| {
//!         SCATTERING => s.scattering,
//!         TINT => s.tint,
//!     }
//! }
//! ```
//!
//! Derived values (phase parameters, container bounds) are plain expressions
//! in the table and are recomputed on every bind.

use std::fmt;

use glam::{Vec2, Vec3, Vec4};
use nimbus_core::{ProgramId, TextureId};

// ─── Names and Values ─────────────────────────────────────────────────────────

/// Shader uniform identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformName(&'static str);

impl UniformName {
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

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A single uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec4(Vec4),
    /// Texture binding. `None` binds the backend's default texture.
    Texture(Option<TextureId>),
}

/// Conversion of settings leaf values into [`UniformValue`]s.
pub trait IntoUniform {
    fn into_uniform(self) -> UniformValue;
}

impl IntoUniform for f32 {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Float(self)
    }
}

impl IntoUniform for i32 {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Int(self)
    }
}

impl IntoUniform for u32 {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Int(self as i32)
    }
}

/// Shaders read booleans as `0` / `1` integers.
impl IntoUniform for bool {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Int(i32::from(self))
    }
}

impl IntoUniform for Vec4 {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Vec4(self)
    }
}

impl IntoUniform for Vec3 {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Vec4(self.extend(0.0))
    }
}

impl IntoUniform for Vec2 {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Vec4(Vec4::new(self.x, self.y, 0.0, 0.0))
    }
}

impl IntoUniform for Option<TextureId> {
    fn into_uniform(self) -> UniformValue {
        UniformValue::Texture(self)
    }
}

impl IntoUniform for UniformValue {
    fn into_uniform(self) -> UniformValue {
        self
    }
}

// ─── Uniform Block ────────────────────────────────────────────────────────────

/// Ordered set of uniform values for one program.
///
/// Order follows the table that produced it, so two binds of the same
/// settings compare equal entry by entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBlock {
    entries: Vec<(UniformName, UniformValue)>,
}

impl UniformBlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing an earlier value for the same name in place.
    pub fn set(&mut self, name: UniformName, value: UniformValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: UniformName) -> Option<UniformValue> {
        self.entries
            .iter()
            .find_map(|&(n, v)| (n == name).then_some(v))
    }

    #[must_use]
    pub fn float(&self, name: UniformName) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn int(&self, name: UniformName) -> Option<i32> {
        match self.get(name)? {
            UniformValue::Int(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn vec4(&self, name: UniformName) -> Option<Vec4> {
        match self.get(name)? {
            UniformValue::Vec4(v) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (UniformName, UniformValue)> + '_ {
        self.entries.iter().copied()
    }

    /// Names in table order.
    pub fn names(&self) -> impl Iterator<Item = UniformName> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    /// Texture bindings, in table order.
    pub fn textures(&self) -> impl Iterator<Item = (UniformName, Option<TextureId>)> + '_ {
        self.entries.iter().filter_map(|&(n, v)| match v {
            UniformValue::Texture(t) => Some((n, t)),
            _ => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Packs every non-texture value into its own 16-byte slot, in table
    /// order. Scalars occupy the first lane; integers are stored bit-for-bit.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let slots: Vec<[u32; 4]> = self
            .entries
            .iter()
            .filter_map(|(_, v)| match *v {
                UniformValue::Float(f) => Some([f.to_bits(), 0, 0, 0]),
                UniformValue::Int(i) => Some([i as u32, 0, 0, 0]),
                UniformValue::Vec4(v) => Some(v.to_array().map(f32::to_bits)),
                UniformValue::Texture(_) => None,
            })
            .collect();
        bytemuck::cast_slice(&slots).to_vec()
    }
}

// ─── Binding ──────────────────────────────────────────────────────────────────

/// A settings record with a static uniform table.
///
/// Implement through [`uniform_table!`].
pub trait ShaderParameters {
    /// Writes every uniform in the table, recomputing derived values.
    fn write_uniforms(&self, out: &mut UniformBlock);

    /// Every uniform name the table writes, in order.
    fn uniform_names() -> &'static [UniformName]
    where
        Self: Sized;
}

/// A shader program plus the uniform values last bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInstance {
    program: ProgramId,
    uniforms: UniformBlock,
}

impl MaterialInstance {
    #[must_use]
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            uniforms: UniformBlock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }
}

/// Returns `true` when no name appears twice.
#[doc(hidden)]
#[must_use]
pub fn names_are_unique(names: &[UniformName]) -> bool {
    names
        .iter()
        .enumerate()
        .all(|(i, name)| !names[i + 1..].contains(name))
}

/// Writes settings into material instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    /// Replaces the material's uniforms with the projection of `settings`.
    ///
    /// The result depends only on `settings`: nothing from a previous bind
    /// survives.
    pub fn bind<S: ShaderParameters + ?Sized>(material: &mut MaterialInstance, settings: &S) {
        material.uniforms.clear();
        settings.write_uniforms(&mut material.uniforms);
    }
}

/// Implements [`ShaderParameters`] for a settings type from a static table of
/// `UNIFORM_NAME => expression` entries.
///
/// The closure-like binder names the settings value inside the expressions.
#[macro_export]
macro_rules! uniform_table {
    (
        $settings:ty => |$s:ident| {
            $( $name:expr => $value:expr ),* $(,)?
        }
    ) => {
        impl $crate::binder::ShaderParameters for $settings {
            fn write_uniforms(&self, out: &mut $crate::binder::UniformBlock) {
                debug_assert!(
                    $crate::binder::names_are_unique(
                        <Self as $crate::binder::ShaderParameters>::uniform_names()
                    ),
                    "uniform table for {} repeats a uniform name",
                    stringify!($settings)
                );
                let $s = self;
                $(
                    out.set($name, $crate::binder::IntoUniform::into_uniform($value));
                )*
            }

            fn uniform_names() -> &'static [$crate::binder::UniformName] {
                const NAMES: &[$crate::binder::UniformName] = &[ $( $name ),* ];
                NAMES
            }
        }
    };
}
