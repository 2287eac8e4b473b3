use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::coords::Viewport;
use crate::graphics::{
    AttributeLayout, GraphicsApi, IndexBuffer, PrimitiveTopology, ShaderError, ShaderProgram,
    ShaderType, VertexArray, VertexBuffer,
};
use crate::math::ProjectionBounds;

use super::{FRACTAL_SHADER, PROJECTION_UNIFORM};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 4],
}

/// Full-screen quad in clip space.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0, 0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0, 0.0, 1.0] },
    QuadVertex { position: [1.0, 1.0, 0.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0, 0.0, 1.0] },
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 0, 3];

/// Region of the complex plane shown in a square viewport.
pub const FRACTAL_BOUNDS: ProjectionBounds = ProjectionBounds::new(-2.0, 0.47, -1.12, 1.12);

/// The drawable unit: quad geometry, its vertex array and the fractal program.
///
/// `create` returns a ready pipeline and `destroy` consumes it, so a pipeline
/// can only be submitted between the two.
#[derive(Debug)]
pub struct FractalPipeline {
    vertex_array: VertexArray,
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    shader: ShaderProgram,
}

impl FractalPipeline {
    /// Builds the program first; on failure nothing else has been allocated.
    pub fn create(gl: &mut dyn GraphicsApi) -> Result<Self, ShaderError> {
        let shader = ShaderProgram::create(gl, &FRACTAL_SHADER)?;

        let mut vertex_array = VertexArray::create(gl);
        vertex_array.bind(gl);

        let mut vertex_buffer = VertexBuffer::create(gl);
        vertex_buffer.set_layout(Rc::new(AttributeLayout::new([ShaderType::Float4])));
        vertex_buffer.upload(gl, &QUAD_VERTICES);

        let mut index_buffer = IndexBuffer::create(gl);
        index_buffer.upload(gl, &QUAD_INDICES);

        vertex_array.attach_vertex_buffer(gl, &vertex_buffer);
        vertex_array.attach_index_buffer(gl, &index_buffer);
        VertexArray::unbind(gl);

        log::info!(
            "fractal pipeline ready ({} vertices, {} indices)",
            QUAD_VERTICES.len(),
            index_buffer.count()
        );

        Ok(Self {
            vertex_array,
            vertex_buffer,
            index_buffer,
            shader,
        })
    }

    /// Re-projects for a `width × height` viewport and draws the quad.
    ///
    /// A zero-area viewport draws nothing.
    pub fn submit(&self, gl: &mut dyn GraphicsApi, width: u32, height: u32) {
        let viewport = Viewport::new(width as f32, height as f32);
        let Some(bounds) = FRACTAL_BOUNDS.aspect_corrected(viewport) else {
            log::trace!("fractal: {width}x{height} viewport, frame skipped");
            return;
        };

        self.shader.uniform_mat4(gl, PROJECTION_UNIFORM, &bounds.matrix());
        self.shader.bind(gl);
        self.vertex_array.bind(gl);
        gl.draw_elements(PrimitiveTopology::TriangleList, self.index_buffer.count());
        VertexArray::unbind(gl);
    }

    pub fn destroy(self, gl: &mut dyn GraphicsApi) {
        self.shader.destroy(gl);
        self.index_buffer.destroy(gl);
        self.vertex_buffer.destroy(gl);
        self.vertex_array.destroy(gl);
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn vertex_array(&self) -> &VertexArray {
        &self.vertex_array
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &IndexBuffer {
        &self.index_buffer
    }
}
