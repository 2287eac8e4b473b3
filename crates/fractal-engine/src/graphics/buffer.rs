use std::rc::Rc;

use bytemuck::Pod;

use super::api::{BufferTarget, BufferUsage, GraphicsApi, RawBuffer};
use super::layout::AttributeLayout;

/// GPU array of vertex records.
///
/// The layout is metadata only: it is read when the buffer is attached to a
/// [`super::VertexArray`]. Release with [`VertexBuffer::destroy`].
#[derive(Debug)]
pub struct VertexBuffer {
    handle: Option<RawBuffer>,
    layout: Option<Rc<AttributeLayout>>,
}

impl VertexBuffer {
    /// Allocates an empty buffer and leaves it bound.
    pub fn create(gl: &mut dyn GraphicsApi) -> Self {
        let handle = gl.create_buffer();
        gl.bind_buffer(BufferTarget::Array, Some(handle));
        Self {
            handle: Some(handle),
            layout: None,
        }
    }

    pub fn destroy(mut self, gl: &mut dyn GraphicsApi) {
        if let Some(handle) = self.handle.take() {
            gl.delete_buffer(handle);
        }
    }

    pub fn raw(&self) -> Option<RawBuffer> {
        self.handle
    }

    pub fn set_layout(&mut self, layout: Rc<AttributeLayout>) {
        self.layout = Some(layout);
    }

    pub fn layout(&self) -> Option<&AttributeLayout> {
        self.layout.as_deref()
    }

    /// Replaces the whole buffer contents with `vertices`.
    pub fn upload<T: Pod>(&self, gl: &mut dyn GraphicsApi, vertices: &[T]) {
        if let Some(layout) = self.layout() {
            debug_assert_eq!(
                std::mem::size_of::<T>() as u32,
                layout.stride(),
                "vertex type size does not match layout stride"
            );
        }
        self.bind(gl);
        gl.buffer_data(
            BufferTarget::Array,
            bytemuck::cast_slice(vertices),
            BufferUsage::DynamicDraw,
        );
    }

    pub fn bind(&self, gl: &mut dyn GraphicsApi) {
        gl.bind_buffer(BufferTarget::Array, self.handle);
    }

    pub fn unbind(gl: &mut dyn GraphicsApi) {
        gl.bind_buffer(BufferTarget::Array, None);
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("vertex buffer {handle:?} dropped without destroy(); GPU object leaked");
        }
    }
}

/// GPU array of `u32` indices.
///
/// `count` tracks the most recent upload.
#[derive(Debug)]
pub struct IndexBuffer {
    handle: Option<RawBuffer>,
    count: u32,
}

impl IndexBuffer {
    /// Allocates an empty buffer and leaves it bound.
    pub fn create(gl: &mut dyn GraphicsApi) -> Self {
        let handle = gl.create_buffer();
        gl.bind_buffer(BufferTarget::ElementArray, Some(handle));
        Self {
            handle: Some(handle),
            count: 0,
        }
    }

    pub fn destroy(mut self, gl: &mut dyn GraphicsApi) {
        if let Some(handle) = self.handle.take() {
            gl.delete_buffer(handle);
        }
    }

    pub fn raw(&self) -> Option<RawBuffer> {
        self.handle
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn upload(&mut self, gl: &mut dyn GraphicsApi, indices: &[u32]) {
        self.bind(gl);
        gl.buffer_data(
            BufferTarget::ElementArray,
            bytemuck::cast_slice(indices),
            BufferUsage::DynamicDraw,
        );
        self.count = indices.len() as u32;
    }

    pub fn bind(&self, gl: &mut dyn GraphicsApi) {
        gl.bind_buffer(BufferTarget::ElementArray, self.handle);
    }

    pub fn unbind(gl: &mut dyn GraphicsApi) {
        gl.bind_buffer(BufferTarget::ElementArray, None);
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("index buffer {handle:?} dropped without destroy(); GPU object leaked");
        }
    }
}
