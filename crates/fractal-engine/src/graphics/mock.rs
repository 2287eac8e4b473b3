//! Recording fake of [`GraphicsApi`] for unit tests.
//!
//! Every command is appended to a call log. Handles are allocated from one
//! counter so they are unique across object kinds, and the set of live
//! objects is tracked so tests can assert that nothing leaks. Commands that a
//! real driver would reject (unknown handle, nothing bound, out-of-range
//! draw) are recorded as violations instead of panicking.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;

use super::api::{
    ActiveUniform, BufferTarget, BufferUsage, GraphicsApi, PrimitiveTopology, RawBuffer,
    RawProgram, RawShader, RawVertexArray, ShaderStage, UniformLocation,
};
use super::state::{BindState, VertexArrayState};
use super::types::{ScalarKind, ShaderType, UniformType, UniformValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateShader(ShaderStage, RawShader),
    CompileShader(RawShader, ShaderStage),
    DeleteShader(RawShader),
    CreateProgram(RawProgram),
    AttachShader(RawProgram, RawShader),
    LinkProgram(RawProgram),
    DeleteProgram(RawProgram),
    UseProgram(Option<RawProgram>),
    SetUniform(Option<UniformLocation>, UniformValue),
    CreateBuffer(RawBuffer),
    BindBuffer(BufferTarget, Option<RawBuffer>),
    BufferData {
        target: BufferTarget,
        buffer: Option<RawBuffer>,
        len: usize,
        usage: BufferUsage,
    },
    DeleteBuffer(RawBuffer),
    CreateVertexArray(RawVertexArray),
    BindVertexArray(Option<RawVertexArray>),
    EnableVertexAttribArray(u32),
    VertexAttribPointerF32 {
        index: u32,
        components: u32,
        stride: u32,
        offset: u32,
    },
    VertexAttribPointerI32 {
        index: u32,
        components: u32,
        stride: u32,
        offset: u32,
    },
    DeleteVertexArray(RawVertexArray),
    DrawElements(PrimitiveTopology, u32),
}

/// Snapshot of what a successful draw consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: RawProgram,
    pub vertex_array: RawVertexArray,
    pub index_buffer: RawBuffer,
    pub topology: PrimitiveTopology,
    pub count: u32,
    /// Uniform values of the program at draw time, by name.
    pub uniforms: BTreeMap<String, UniformValue>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Kind {
    Shader,
    Program,
    Buffer,
    VertexArray,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<RawShader>,
    linked: bool,
    values: HashMap<u32, UniformValue>,
}

#[derive(Debug)]
struct BufferRecord {
    data: Vec<u8>,
    usage: Option<BufferUsage>,
}

#[derive(Debug, Default)]
pub struct MockGraphics {
    next_id: u32,
    live: HashMap<u32, Kind>,
    calls: Vec<Call>,
    violations: Vec<String>,

    compile_failure: Option<(ShaderStage, String)>,
    link_failure: Option<String>,
    uniforms: Vec<(String, UniformType)>,
    location_queries: Cell<usize>,

    shaders: HashMap<RawShader, (ShaderStage, bool)>,
    programs: HashMap<RawProgram, ProgramRecord>,
    buffers: HashMap<RawBuffer, BufferRecord>,
    state: BindState,
    draws: Vec<DrawRecord>,
}

impl MockGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an active uniform reported by every linked program.
    pub fn with_uniform(mut self, name: &str, ty: UniformType) -> Self {
        self.uniforms.push((name.to_string(), ty));
        self
    }

    /// Makes compilation of `stage` fail with `log`.
    pub fn failing_compile(mut self, stage: ShaderStage, log: &str) -> Self {
        self.compile_failure = Some((stage, log.to_string()));
        self
    }

    pub fn failing_link(mut self, log: &str) -> Self {
        self.link_failure = Some(log.to_string());
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn calls_since(&self, start: usize) -> &[Call] {
        &self.calls[start.min(self.calls.len())..]
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn is_live(&self, id: u32) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn location_queries(&self) -> usize {
        self.location_queries.get()
    }

    pub fn bound_program(&self) -> Option<RawProgram> {
        self.state.program
    }

    pub fn bound_vertex_array(&self) -> Option<RawVertexArray> {
        self.state.vertex_array
    }

    pub fn uniform_value(&self, program: RawProgram, name: &str) -> Option<UniformValue> {
        let location = self.uniforms.iter().position(|(n, _)| n == name)? as u32;
        self.programs.get(&program)?.values.get(&location).copied()
    }

    pub fn buffer_contents(&self, buffer: RawBuffer) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_usage(&self, buffer: RawBuffer) -> Option<BufferUsage> {
        self.buffers.get(&buffer).and_then(|b| b.usage)
    }

    pub fn vertex_array_state(&self, vertex_array: RawVertexArray) -> Option<&VertexArrayState> {
        self.state.vertex_arrays.get(&vertex_array)
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    fn alloc(&mut self, kind: Kind) -> NonZeroU32 {
        self.next_id += 1;
        let id = NonZeroU32::MIN.saturating_add(self.next_id - 1);
        self.live.insert(id.get(), kind);
        id
    }

    fn release(&mut self, id: u32, kind: Kind, what: &str) -> bool {
        match self.live.get(&id) {
            Some(k) if *k == kind => {
                self.live.remove(&id);
                true
            }
            _ => {
                self.violation(format!("delete of unknown {what} {id}"));
                false
            }
        }
    }

    fn require(&mut self, id: u32, kind: Kind, what: &str) -> bool {
        if self.live.get(&id) == Some(&kind) {
            true
        } else {
            self.violation(format!("{what} {id} is not a live object"));
            false
        }
    }

    fn violation(&mut self, msg: String) {
        log::warn!("mock graphics: {msg}");
        self.violations.push(msg);
    }

    fn attrib_pointer(&mut self, kind: ScalarKind, index: u32, components: u32, stride: u32, offset: u32) {
        let Some(ty) = ShaderType::from_parts(kind, components) else {
            self.violation(format!("attribute {index}: invalid component count {components}"));
            return;
        };
        if !self.state.describe_attribute(index, ty, stride, offset) {
            self.violation(format!("attribute {index} described without array buffer and vertex array"));
        }
    }

    fn try_draw(&mut self, topology: PrimitiveTopology, count: u32) -> Result<DrawRecord, String> {
        let program = self.state.program.ok_or("draw with no program in use")?;
        if !self.programs.get(&program).is_some_and(|p| p.linked) {
            return Err(format!("draw with unlinked program {program:?}"));
        }
        let vertex_array = self.state.vertex_array.ok_or("draw with no vertex array bound")?;
        let state = self
            .state
            .vertex_arrays
            .get(&vertex_array)
            .ok_or("draw with deleted vertex array")?;
        let index_buffer = state.element_buffer.ok_or("draw with no index buffer")?;
        for (slot, binding) in state.enabled_attributes() {
            if !self.buffers.contains_key(&binding.buffer) {
                return Err(format!("attribute {slot} reads deleted buffer {:?}", binding.buffer));
            }
        }
        let available = self
            .buffers
            .get(&index_buffer)
            .map(|b| b.data.len() / 4)
            .ok_or("index buffer was deleted")?;
        if count as usize > available {
            return Err(format!("draw of {count} indices from a buffer of {available}"));
        }

        let values = &self.programs[&program].values;
        let uniforms = self
            .uniforms
            .iter()
            .enumerate()
            .filter_map(|(i, (name, _))| values.get(&(i as u32)).map(|v| (name.clone(), *v)))
            .collect();

        Ok(DrawRecord {
            program,
            vertex_array,
            index_buffer,
            topology,
            count,
            uniforms,
        })
    }
}

impl GraphicsApi for MockGraphics {
    fn create_shader(&mut self, stage: ShaderStage) -> RawShader {
        let shader = RawShader::new(self.alloc(Kind::Shader));
        self.shaders.insert(shader, (stage, false));
        self.calls.push(Call::CreateShader(stage, shader));
        shader
    }

    fn compile_shader(&mut self, shader: RawShader, _source: &str) -> Result<(), String> {
        let Some((stage, _)) = self.shaders.get(&shader).copied() else {
            self.violation(format!("compile of unknown shader {shader:?}"));
            return Err("unknown shader".to_string());
        };
        self.calls.push(Call::CompileShader(shader, stage));
        if let Some((failing, log)) = &self.compile_failure {
            if *failing == stage {
                return Err(log.clone());
            }
        }
        self.shaders.insert(shader, (stage, true));
        Ok(())
    }

    fn delete_shader(&mut self, shader: RawShader) {
        self.calls.push(Call::DeleteShader(shader));
        if self.release(shader.get(), Kind::Shader, "shader") {
            self.shaders.remove(&shader);
        }
    }

    fn create_program(&mut self) -> RawProgram {
        let program = RawProgram::new(self.alloc(Kind::Program));
        self.programs.insert(program, ProgramRecord::default());
        self.calls.push(Call::CreateProgram(program));
        program
    }

    fn attach_shader(&mut self, program: RawProgram, shader: RawShader) {
        self.calls.push(Call::AttachShader(program, shader));
        if !self.require(shader.get(), Kind::Shader, "shader") {
            return;
        }
        match self.programs.get_mut(&program) {
            Some(record) => record.attached.push(shader),
            None => self.violation(format!("attach to unknown program {program:?}")),
        }
    }

    fn link_program(&mut self, program: RawProgram) -> Result<(), String> {
        self.calls.push(Call::LinkProgram(program));
        let Some(record) = self.programs.get(&program) else {
            self.violation(format!("link of unknown program {program:?}"));
            return Err("unknown program".to_string());
        };
        let compiled = |stage| {
            record
                .attached
                .iter()
                .any(|s| self.shaders.get(s) == Some(&(stage, true)))
        };
        if !compiled(ShaderStage::Vertex) || !compiled(ShaderStage::Fragment) {
            return Err("program needs a compiled vertex and fragment shader".to_string());
        }
        if let Some(log) = &self.link_failure {
            return Err(log.clone());
        }
        if let Some(record) = self.programs.get_mut(&program) {
            record.linked = true;
        }
        Ok(())
    }

    fn delete_program(&mut self, program: RawProgram) {
        self.calls.push(Call::DeleteProgram(program));
        if self.release(program.get(), Kind::Program, "program") {
            self.programs.remove(&program);
            self.state.forget_program(program);
        }
    }

    fn active_uniforms(&self, program: RawProgram) -> Vec<ActiveUniform> {
        if !self.programs.get(&program).is_some_and(|p| p.linked) {
            return Vec::new();
        }
        self.uniforms
            .iter()
            .map(|(name, ty)| ActiveUniform {
                name: name.clone(),
                ty: *ty,
            })
            .collect()
    }

    fn uniform_location(&self, program: RawProgram, name: &str) -> Option<UniformLocation> {
        self.location_queries.set(self.location_queries.get() + 1);
        if !self.programs.get(&program).is_some_and(|p| p.linked) {
            return None;
        }
        let index = self.uniforms.iter().position(|(n, _)| n == name)?;
        Some(UniformLocation(index as u32))
    }

    fn use_program(&mut self, program: Option<RawProgram>) {
        self.calls.push(Call::UseProgram(program));
        if let Some(p) = program {
            if !self.programs.get(&p).is_some_and(|r| r.linked) {
                self.violation(format!("use of unknown or unlinked program {p:?}"));
                return;
            }
        }
        self.state.program = program;
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: &UniformValue) {
        self.calls.push(Call::SetUniform(location, *value));
        let Some(location) = location else { return };
        let Some(program) = self.state.program else {
            self.violation("uniform write with no program in use".to_string());
            return;
        };
        let Some((name, declared)) = self.uniforms.get(location.0 as usize) else {
            self.violation(format!("uniform write to unknown location {}", location.0));
            return;
        };
        if *declared != value.ty() {
            log::warn!("uniform `{name}` is {declared:?}; ignoring {:?} value", value.ty());
            return;
        }
        if let Some(record) = self.programs.get_mut(&program) {
            record.values.insert(location.0, *value);
        }
    }

    fn create_buffer(&mut self) -> RawBuffer {
        let buffer = RawBuffer::new(self.alloc(Kind::Buffer));
        self.buffers.insert(
            buffer,
            BufferRecord {
                data: Vec::new(),
                usage: None,
            },
        );
        self.calls.push(Call::CreateBuffer(buffer));
        buffer
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<RawBuffer>) {
        self.calls.push(Call::BindBuffer(target, buffer));
        if let Some(b) = buffer {
            if !self.require(b.get(), Kind::Buffer, "buffer") {
                return;
            }
        }
        self.state.bind_buffer(target, buffer);
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let buffer = self.state.bound_buffer(target);
        self.calls.push(Call::BufferData {
            target,
            buffer,
            len: data.len(),
            usage,
        });
        let Some(record) = buffer.and_then(|b| self.buffers.get_mut(&b)) else {
            self.violation(format!("buffer data with nothing bound to {target:?}"));
            return;
        };
        record.data = data.to_vec();
        record.usage = Some(usage);
    }

    fn delete_buffer(&mut self, buffer: RawBuffer) {
        self.calls.push(Call::DeleteBuffer(buffer));
        if self.release(buffer.get(), Kind::Buffer, "buffer") {
            self.buffers.remove(&buffer);
            self.state.forget_buffer(buffer);
        }
    }

    fn create_vertex_array(&mut self) -> RawVertexArray {
        let vertex_array = RawVertexArray::new(self.alloc(Kind::VertexArray));
        self.state
            .vertex_arrays
            .insert(vertex_array, VertexArrayState::default());
        self.calls.push(Call::CreateVertexArray(vertex_array));
        vertex_array
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<RawVertexArray>) {
        self.calls.push(Call::BindVertexArray(vertex_array));
        if let Some(va) = vertex_array {
            if !self.require(va.get(), Kind::VertexArray, "vertex array") {
                return;
            }
        }
        self.state.vertex_array = vertex_array;
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.calls.push(Call::EnableVertexAttribArray(index));
        match self.state.bound_vertex_array_mut() {
            Some(state) => state.enable(index),
            None => self.violation(format!("enable of attribute {index} with no vertex array bound")),
        }
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, components: u32, stride: u32, offset: u32) {
        self.calls.push(Call::VertexAttribPointerF32 {
            index,
            components,
            stride,
            offset,
        });
        self.attrib_pointer(ScalarKind::Float, index, components, stride, offset);
    }

    fn vertex_attrib_pointer_i32(&mut self, index: u32, components: u32, stride: u32, offset: u32) {
        self.calls.push(Call::VertexAttribPointerI32 {
            index,
            components,
            stride,
            offset,
        });
        self.attrib_pointer(ScalarKind::Int, index, components, stride, offset);
    }

    fn delete_vertex_array(&mut self, vertex_array: RawVertexArray) {
        self.calls.push(Call::DeleteVertexArray(vertex_array));
        if self.release(vertex_array.get(), Kind::VertexArray, "vertex array") {
            self.state.forget_vertex_array(vertex_array);
        }
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32) {
        self.calls.push(Call::DrawElements(topology, count));
        match self.try_draw(topology, count) {
            Ok(record) => self.draws.push(record),
            Err(msg) => self.violation(msg),
        }
    }
}
