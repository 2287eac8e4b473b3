//! GPU resource layer: shader programs, buffers, attribute layouts and vertex
//! arrays, written against the [`GraphicsApi`] command surface.

pub mod api;
pub mod backend;
pub mod buffer;
pub mod layout;
pub mod shader;
pub mod state;
pub mod types;
pub mod vertex_array;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{
    BufferTarget, BufferUsage, GraphicsApi, PrimitiveTopology, ShaderStage, UniformLocation,
};
pub use backend::WgpuBackend;
pub use buffer::{IndexBuffer, VertexBuffer};
pub use layout::AttributeLayout;
pub use shader::{ShaderError, ShaderProgram, ShaderSource};
pub use types::{ScalarKind, ShaderType, UniformType, UniformValue};
pub use vertex_array::VertexArray;
