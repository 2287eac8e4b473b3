//! Command surface every GPU resource wrapper is written against.
//!
//! `GraphicsApi` is a bind-then-operate state machine: objects are named by
//! opaque handles, and uploads, attribute descriptions and uniform writes act
//! on whatever is currently bound. [`crate::graphics::WgpuBackend`] implements
//! it on top of wgpu; tests use a recording fake.

use std::num::NonZeroU32;

use super::types::{UniformType, UniformValue};

macro_rules! raw_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            #[inline]
            pub const fn new(id: NonZeroU32) -> Self {
                Self(id)
            }

            #[inline]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

raw_handle!(
    /// Handle of a single compiled shader stage.
    RawShader
);
raw_handle!(
    /// Handle of a linked program.
    RawProgram
);
raw_handle!(
    /// Handle of a buffer object (vertex or index data).
    RawBuffer
);
raw_handle!(
    /// Handle of a vertex array object.
    RawVertexArray
);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// Bind point a buffer is attached to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute source.
    Array,
    /// Index source; recorded in the bound vertex array.
    ElementArray,
}

/// Upload frequency hint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    DynamicDraw,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
}

/// Location of a uniform inside one program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// One entry of a program's active uniform list.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUniform {
    pub name: String,
    pub ty: UniformType,
}

/// Low-level graphics commands.
///
/// Fallible calls return the backend diagnostic as a `String`. Misuse that a
/// driver would flag as an invalid operation (unknown handle, nothing bound)
/// is logged and ignored by implementations rather than panicking.
pub trait GraphicsApi {
    // ── shaders & programs ───────────────────────────────────────────────

    fn create_shader(&mut self, stage: ShaderStage) -> RawShader;

    /// Compiles `source` into `shader`. `Err` carries the compiler log.
    fn compile_shader(&mut self, shader: RawShader, source: &str) -> Result<(), String>;

    fn delete_shader(&mut self, shader: RawShader);

    fn create_program(&mut self) -> RawProgram;

    fn attach_shader(&mut self, program: RawProgram, shader: RawShader);

    /// Links the attached stages. `Err` carries the linker log.
    fn link_program(&mut self, program: RawProgram) -> Result<(), String>;

    fn delete_program(&mut self, program: RawProgram);

    fn active_uniforms(&self, program: RawProgram) -> Vec<ActiveUniform>;

    fn uniform_location(&self, program: RawProgram, name: &str) -> Option<UniformLocation>;

    fn use_program(&mut self, program: Option<RawProgram>);

    /// Writes a uniform of the program in use. `None` is accepted and ignored.
    fn set_uniform(&mut self, location: Option<UniformLocation>, value: &UniformValue);

    // ── buffers ──────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> RawBuffer;

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<RawBuffer>);

    /// Replaces the whole contents of the buffer bound to `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    fn delete_buffer(&mut self, buffer: RawBuffer);

    // ── vertex arrays ────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> RawVertexArray;

    fn bind_vertex_array(&mut self, vertex_array: Option<RawVertexArray>);

    fn enable_vertex_attrib_array(&mut self, index: u32);

    /// Describes float attribute `index`, sourced from the bound array buffer.
    fn vertex_attrib_pointer_f32(&mut self, index: u32, components: u32, stride: u32, offset: u32);

    /// Describes integer attribute `index`; values reach the shader unconverted.
    fn vertex_attrib_pointer_i32(&mut self, index: u32, components: u32, stride: u32, offset: u32);

    fn delete_vertex_array(&mut self, vertex_array: RawVertexArray);

    // ── drawing ──────────────────────────────────────────────────────────

    /// Draws `count` `u32` indices from the bound vertex array's index buffer
    /// with the program in use.
    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32);
}
