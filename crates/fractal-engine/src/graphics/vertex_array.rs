use super::api::{BufferTarget, GraphicsApi, RawBuffer, RawVertexArray};
use super::buffer::{IndexBuffer, VertexBuffer};
use super::types::ScalarKind;

/// Binds a vertex buffer's layout to attribute slots, plus one index buffer.
///
/// Holds the raw handles of attached buffers for introspection only; the
/// buffers stay owned by the caller.
#[derive(Debug)]
pub struct VertexArray {
    handle: Option<RawVertexArray>,
    vertex_buffer: Option<RawBuffer>,
    index_buffer: Option<RawBuffer>,
}

impl VertexArray {
    pub fn create(gl: &mut dyn GraphicsApi) -> Self {
        Self {
            handle: Some(gl.create_vertex_array()),
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn destroy(mut self, gl: &mut dyn GraphicsApi) {
        if let Some(handle) = self.handle.take() {
            gl.delete_vertex_array(handle);
        }
    }

    pub fn raw(&self) -> Option<RawVertexArray> {
        self.handle
    }

    pub fn vertex_buffer(&self) -> Option<RawBuffer> {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<RawBuffer> {
        self.index_buffer
    }

    /// Enables one slot per layout attribute and points it at `buffer`.
    pub fn attach_vertex_buffer(&mut self, gl: &mut dyn GraphicsApi, buffer: &VertexBuffer) {
        let Some(layout) = buffer.layout() else {
            log::error!(
                "vertex buffer {:?} has no attribute layout; not attached",
                buffer.raw()
            );
            return;
        };

        self.bind(gl);
        buffer.bind(gl);

        let stride = layout.stride();
        for (slot, ty, offset) in layout.offsets() {
            gl.enable_vertex_attrib_array(slot);
            match ty.kind() {
                ScalarKind::Int => gl.vertex_attrib_pointer_i32(slot, ty.components(), stride, offset),
                ScalarKind::Float => gl.vertex_attrib_pointer_f32(slot, ty.components(), stride, offset),
            }
        }

        self.vertex_buffer = buffer.raw();
    }

    pub fn attach_index_buffer(&mut self, gl: &mut dyn GraphicsApi, buffer: &IndexBuffer) {
        self.bind(gl);
        gl.bind_buffer(BufferTarget::ElementArray, buffer.raw());
        self.index_buffer = buffer.raw();
    }

    pub fn bind(&self, gl: &mut dyn GraphicsApi) {
        gl.bind_vertex_array(self.handle);
    }

    pub fn unbind(gl: &mut dyn GraphicsApi) {
        gl.bind_vertex_array(None);
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("vertex array {handle:?} dropped without destroy(); GPU object leaked");
        }
    }
}
