//! Data-type tags shared by attribute layouts and uniforms.

use glam::{IVec2, IVec3, IVec4, Mat4, Vec2, Vec3, Vec4};

/// Scalar family of a shader value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
}

/// Shape of a vertex attribute or basic uniform: a scalar or vector of
/// 1 to 4 components, integer or floating.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderType {
    Int,
    Int2,
    Int3,
    Int4,
    Float,
    Float2,
    Float3,
    Float4,
}

impl ShaderType {
    /// Samplers are bound through an int uniform holding the texture unit.
    pub const SAMPLER: ShaderType = ShaderType::Int;

    /// Number of components (1..=4).
    pub const fn components(self) -> u32 {
        match self {
            ShaderType::Int | ShaderType::Float => 1,
            ShaderType::Int2 | ShaderType::Float2 => 2,
            ShaderType::Int3 | ShaderType::Float3 => 3,
            ShaderType::Int4 | ShaderType::Float4 => 4,
        }
    }

    pub const fn kind(self) -> ScalarKind {
        match self {
            ShaderType::Int | ShaderType::Int2 | ShaderType::Int3 | ShaderType::Int4 => {
                ScalarKind::Int
            }
            ShaderType::Float | ShaderType::Float2 | ShaderType::Float3 | ShaderType::Float4 => {
                ScalarKind::Float
            }
        }
    }

    /// Byte width of one value of this type in a vertex record.
    pub const fn size_bytes(self) -> u32 {
        // i32 and f32 are both 4 bytes wide.
        self.components() * 4
    }

    /// Builds the tag from a scalar kind and component count.
    pub const fn from_parts(kind: ScalarKind, components: u32) -> Option<ShaderType> {
        match (kind, components) {
            (ScalarKind::Int, 1) => Some(ShaderType::Int),
            (ScalarKind::Int, 2) => Some(ShaderType::Int2),
            (ScalarKind::Int, 3) => Some(ShaderType::Int3),
            (ScalarKind::Int, 4) => Some(ShaderType::Int4),
            (ScalarKind::Float, 1) => Some(ShaderType::Float),
            (ScalarKind::Float, 2) => Some(ShaderType::Float2),
            (ScalarKind::Float, 3) => Some(ShaderType::Float3),
            (ScalarKind::Float, 4) => Some(ShaderType::Float4),
            _ => None,
        }
    }
}

/// Declared type of an active uniform, as reported by shader introspection.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformType {
    Basic(ShaderType),
    Mat4,
    /// Anything the setters cannot write (bools, unsigned, other matrices, arrays).
    Opaque,
}

/// A value written through one of the `ShaderProgram::uniform_*` setters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Int2(IVec2),
    Int3(IVec3),
    Int4(IVec4),
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Basic(ShaderType::Int),
            UniformValue::Int2(_) => UniformType::Basic(ShaderType::Int2),
            UniformValue::Int3(_) => UniformType::Basic(ShaderType::Int3),
            UniformValue::Int4(_) => UniformType::Basic(ShaderType::Int4),
            UniformValue::Float(_) => UniformType::Basic(ShaderType::Float),
            UniformValue::Float2(_) => UniformType::Basic(ShaderType::Float2),
            UniformValue::Float3(_) => UniformType::Basic(ShaderType::Float3),
            UniformValue::Float4(_) => UniformType::Basic(ShaderType::Float4),
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Raw bytes as laid out in a uniform block (matrices column-major).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::Int2(v) => bytemuck::bytes_of(v),
            UniformValue::Int3(v) => bytemuck::bytes_of(v),
            UniformValue::Int4(v) => bytemuck::bytes_of(v),
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Float2(v) => bytemuck::bytes_of(v),
            UniformValue::Float3(v) => bytemuck::bytes_of(v),
            UniformValue::Float4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        }
    }
}
