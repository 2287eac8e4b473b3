//! Bind-point bookkeeping shared by `GraphicsApi` implementations.

use std::collections::{BTreeMap, HashMap};

use super::api::{BufferTarget, RawBuffer, RawProgram, RawVertexArray};
use super::types::ShaderType;

/// How one attribute slot reads from its source buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttributeBinding {
    pub buffer: RawBuffer,
    pub ty: ShaderType,
    pub stride: u32,
    pub offset: u32,
    pub enabled: bool,
}

/// State captured by a vertex array object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexArrayState {
    /// Slot index → binding, ordered by slot.
    pub attributes: BTreeMap<u32, AttributeBinding>,
    pub element_buffer: Option<RawBuffer>,
    /// Slots enabled before any pointer was described for them.
    pub(crate) pending_enable: Vec<u32>,
}

impl VertexArrayState {
    /// Attribute slots that are enabled and fully described.
    pub fn enabled_attributes(&self) -> impl Iterator<Item = (u32, &AttributeBinding)> {
        self.attributes
            .iter()
            .filter(|(_, b)| b.enabled)
            .map(|(i, b)| (*i, b))
    }

    pub(crate) fn enable(&mut self, index: u32) {
        match self.attributes.get_mut(&index) {
            Some(binding) => binding.enabled = true,
            None => {
                if !self.pending_enable.contains(&index) {
                    self.pending_enable.push(index);
                }
            }
        }
    }

    pub(crate) fn describe(&mut self, index: u32, mut binding: AttributeBinding) {
        let was_enabled = self.attributes.get(&index).is_some_and(|b| b.enabled);
        if let Some(pos) = self.pending_enable.iter().position(|i| *i == index) {
            self.pending_enable.swap_remove(pos);
            binding.enabled = true;
        } else {
            binding.enabled = was_enabled;
        }
        self.attributes.insert(index, binding);
    }
}

/// Current bindings plus per-vertex-array state.
///
/// The element-array binding lives in the bound vertex array; binding an index
/// buffer with no vertex array bound is remembered nowhere.
#[derive(Debug, Default)]
pub struct BindState {
    pub program: Option<RawProgram>,
    pub array_buffer: Option<RawBuffer>,
    pub vertex_array: Option<RawVertexArray>,
    pub vertex_arrays: HashMap<RawVertexArray, VertexArrayState>,
}

impl BindState {
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<RawBuffer>) {
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => {
                if let Some(state) = self.bound_vertex_array_mut() {
                    state.element_buffer = buffer;
                } else if buffer.is_some() {
                    log::trace!("element buffer bound with no vertex array; binding not retained");
                }
            }
        }
    }

    /// Buffer currently attached to `target`.
    pub fn bound_buffer(&self, target: BufferTarget) -> Option<RawBuffer> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self
                .vertex_array
                .and_then(|va| self.vertex_arrays.get(&va))
                .and_then(|state| state.element_buffer),
        }
    }

    pub fn bound_vertex_array_mut(&mut self) -> Option<&mut VertexArrayState> {
        let va = self.vertex_array?;
        self.vertex_arrays.get_mut(&va)
    }

    /// Records attribute `index` of the bound vertex array as sourced from the
    /// bound array buffer. Returns `false` when either binding is missing.
    pub fn describe_attribute(&mut self, index: u32, ty: ShaderType, stride: u32, offset: u32) -> bool {
        let Some(buffer) = self.array_buffer else { return false };
        let Some(state) = self.bound_vertex_array_mut() else { return false };
        state.describe(
            index,
            AttributeBinding {
                buffer,
                ty,
                stride,
                offset,
                enabled: false,
            },
        );
        true
    }

    /// Clears every binding that refers to a deleted buffer.
    pub fn forget_buffer(&mut self, buffer: RawBuffer) {
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        for state in self.vertex_arrays.values_mut() {
            if state.element_buffer == Some(buffer) {
                state.element_buffer = None;
            }
        }
    }

    pub fn forget_program(&mut self, program: RawProgram) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    pub fn forget_vertex_array(&mut self, vertex_array: RawVertexArray) {
        self.vertex_arrays.remove(&vertex_array);
        if self.vertex_array == Some(vertex_array) {
            self.vertex_array = None;
        }
    }
}
