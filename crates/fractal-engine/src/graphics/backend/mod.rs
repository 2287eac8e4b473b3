//! [`GraphicsApi`] implemented on wgpu.
//!
//! wgpu has no bind-to-edit state machine, so this backend keeps one:
//! objects live in id-keyed tables, bindings in a [`BindState`]. Shader
//! stages are WGSL, validated and reflected with naga at compile time.
//! Render pipelines are built lazily per (program, vertex layout, topology)
//! and cached. `draw_elements` records a draw; [`WgpuBackend::encode`] plays
//! every recorded draw into one render pass over the frame's color target.
//!
//! Uniform writes land in a per-program CPU copy of the uniform block that is
//! flushed when a draw is recorded. A program drawn twice in one frame with
//! different values gets a fresh uniform buffer for the second draw, so every
//! draw sees the values current when it was issued.

mod reflect;

use std::borrow::Cow;
use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroU64};

use crate::render::RenderTarget;

use super::api::{
    ActiveUniform, BufferTarget, BufferUsage, GraphicsApi, PrimitiveTopology, RawBuffer,
    RawProgram, RawShader, RawVertexArray, ShaderStage, UniformLocation,
};
use super::state::{BindState, VertexArrayState};
use super::types::{ScalarKind, ShaderType, UniformValue};

use reflect::{CompiledStage, UniformBlock};

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,

    next_id: u32,
    shaders: HashMap<RawShader, ShaderObject>,
    programs: HashMap<RawProgram, ProgramObject>,
    buffers: HashMap<RawBuffer, BufferObject>,
    state: BindState,

    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    pending: Vec<PendingDraw>,
}

struct ShaderObject {
    stage: ShaderStage,
    compiled: Option<CompiledStage>,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<CompiledStage>,
    linked: Option<LinkedProgram>,
}

struct LinkedProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    inputs: Vec<(u32, ShaderType)>,
    layout: wgpu::PipelineLayout,
    uniforms: Option<UniformSlot>,
}

struct UniformSlot {
    block: UniformBlock,
    bind_group_layout: wgpu::BindGroupLayout,
    shadow: Vec<u8>,
    dirty: bool,
    gpu: Option<(wgpu::Buffer, wgpu::BindGroup)>,
    in_flight: bool,
}

#[derive(Default)]
struct BufferObject {
    gpu: Option<wgpu::Buffer>,
    len: u64,
    in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: RawProgram,
    topology: PrimitiveTopology,
    streams: Vec<StreamKey>,
}

/// One vertex buffer slot: attributes sharing a source buffer and stride.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    stride: u32,
    attributes: Vec<(u32, ShaderType, u32)>,
}

struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: Option<wgpu::BindGroup>,
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffer: wgpu::Buffer,
    count: u32,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            color_format,
            next_id: 0,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            state: BindState::default(),
            pipelines: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Shader, program, buffer and vertex array objects not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.shaders.len() + self.programs.len() + self.buffers.len() + self.state.vertex_arrays.len()
    }

    /// Records every pending draw into `target`, preserving its contents.
    pub fn encode(&mut self, target: &mut RenderTarget<'_>) {
        if !self.pending.is_empty() {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fractal draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &self.pending {
                rpass.set_pipeline(&draw.pipeline);
                if let Some(bind_group) = &draw.bind_group {
                    rpass.set_bind_group(reflect::UNIFORM_GROUP, bind_group, &[]);
                }
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    rpass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                rpass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..draw.count, 0, 0..1);
            }
        }
        self.discard_pending();
    }

    /// Drops recorded draws without encoding them (frame skipped).
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        for buffer in self.buffers.values_mut() {
            buffer.in_flight = false;
        }
        for program in self.programs.values_mut() {
            if let Some(slot) = program.linked.as_mut().and_then(|l| l.uniforms.as_mut()) {
                slot.in_flight = false;
            }
        }
    }

    fn alloc(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        NonZeroU32::MIN.saturating_add(self.next_id - 1)
    }

    fn linked(&self, program: RawProgram) -> Option<&LinkedProgram> {
        self.programs.get(&program)?.linked.as_ref()
    }

    fn describe(&mut self, kind: ScalarKind, index: u32, components: u32, stride: u32, offset: u32) {
        let Some(ty) = ShaderType::from_parts(kind, components) else {
            log::warn!("wgpu backend: attribute {index} has invalid component count {components}");
            return;
        };
        if !self.state.describe_attribute(index, ty, stride, offset) {
            log::warn!("wgpu backend: attribute {index} described with no array buffer or vertex array bound");
        }
    }

    fn prepare_draw(&mut self, topology: PrimitiveTopology, count: u32) -> Result<PendingDraw, String> {
        let program = self.state.program.ok_or("no program in use")?;
        let vertex_array = self.state.vertex_array.ok_or("no vertex array bound")?;
        let va_state = self
            .state
            .vertex_arrays
            .get(&vertex_array)
            .ok_or("vertex array was deleted")?;

        let index_id = va_state.element_buffer.ok_or("vertex array has no index buffer")?;
        let index_object = self.buffers.get(&index_id).ok_or("index buffer was deleted")?;
        let available = index_object.len / 4;
        if u64::from(count) > available {
            return Err(format!("{count} indices requested, buffer holds {available}"));
        }
        let index_buffer = index_object.gpu.clone().ok_or("index buffer is empty")?;

        let streams = group_streams(va_state);

        // Field borrow: `self.pipelines` is updated below while this is held.
        let linked = self
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .ok_or("program is not linked")?;
        for (location, input) in &linked.inputs {
            let provided = streams
                .iter()
                .flat_map(|(_, key)| &key.attributes)
                .find(|(slot, ..)| slot == location);
            match provided {
                Some((_, ty, _)) if ty.kind() == input.kind() => {}
                Some(_) => return Err(format!("attribute {location} does not match the shader input type")),
                None => return Err(format!("shader input @location({location}) has no enabled attribute")),
            }
        }

        let mut vertex_buffers = Vec::with_capacity(streams.len());
        for (id, _) in &streams {
            let buffer = self
                .buffers
                .get(id)
                .and_then(|b| b.gpu.clone())
                .ok_or_else(|| format!("vertex buffer {id:?} is empty or deleted"))?;
            vertex_buffers.push(buffer);
        }

        let key = PipelineKey {
            program,
            topology,
            streams: streams.iter().map(|(_, key)| key.clone()).collect(),
        };
        let pipeline = match self.pipelines.get(&key) {
            Some(pipeline) => pipeline.clone(),
            None => {
                let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
                let pipeline = build_pipeline(&self.device, self.color_format, linked, &key);
                if let Some(err) = pollster::block_on(scope.pop()) {
                    return Err(format!("pipeline rejected by the device: {err}"));
                }
                log::debug!(
                    "wgpu backend: built pipeline for program {:?} ({} cached)",
                    program,
                    self.pipelines.len() + 1
                );
                self.pipelines.insert(key, pipeline.clone());
                pipeline
            }
        };

        for id in streams.iter().map(|(id, _)| *id).chain([index_id]) {
            if let Some(buffer) = self.buffers.get_mut(&id) {
                buffer.in_flight = true;
            }
        }
        let bind_group = self.flush_uniforms(program);

        Ok(PendingDraw {
            pipeline,
            bind_group,
            vertex_buffers,
            index_buffer,
            count,
        })
    }

    fn flush_uniforms(&mut self, program: RawProgram) -> Option<wgpu::BindGroup> {
        let slot = self
            .programs
            .get_mut(&program)?
            .linked
            .as_mut()?
            .uniforms
            .as_mut()?;

        if slot.gpu.is_none() || (slot.dirty && slot.in_flight) {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("fractal uniform block"),
                size: slot.shadow.len() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("fractal uniform bind group"),
                layout: &slot.bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: reflect::UNIFORM_BINDING,
                    resource: buffer.as_entire_binding(),
                }],
            });
            slot.gpu = Some((buffer, bind_group));
            slot.dirty = true;
        }

        let (buffer, bind_group) = slot.gpu.as_ref()?;
        if slot.dirty {
            self.queue.write_buffer(buffer, 0, &slot.shadow);
            slot.dirty = false;
        }
        slot.in_flight = true;
        Some(bind_group.clone())
    }
}

impl GraphicsApi for WgpuBackend {
    fn create_shader(&mut self, stage: ShaderStage) -> RawShader {
        let shader = RawShader::new(self.alloc());
        self.shaders.insert(
            shader,
            ShaderObject {
                stage,
                compiled: None,
            },
        );
        shader
    }

    fn compile_shader(&mut self, shader: RawShader, source: &str) -> Result<(), String> {
        let capabilities = reflect::shader_capabilities(self.device.features());
        let Some(object) = self.shaders.get_mut(&shader) else {
            log::warn!("wgpu backend: compile of unknown shader {shader:?}");
            return Err(format!("unknown shader {shader:?}"));
        };
        let compiled = reflect::compile_stage(object.stage, source, capabilities)?;
        log::debug!(
            "wgpu backend: compiled {} stage `{}`",
            object.stage.name(),
            compiled.entry_point
        );
        object.compiled = Some(compiled);
        Ok(())
    }

    fn delete_shader(&mut self, shader: RawShader) {
        if self.shaders.remove(&shader).is_none() {
            log::warn!("wgpu backend: delete of unknown shader {shader:?}");
        }
    }

    fn create_program(&mut self) -> RawProgram {
        let program = RawProgram::new(self.alloc());
        self.programs.insert(program, ProgramObject::default());
        program
    }

    fn attach_shader(&mut self, program: RawProgram, shader: RawShader) {
        let Some(compiled) = self.shaders.get(&shader).and_then(|s| s.compiled.clone()) else {
            log::warn!("wgpu backend: shader {shader:?} is unknown or not compiled; not attached");
            return;
        };
        let Some(object) = self.programs.get_mut(&program) else {
            log::warn!("wgpu backend: attach to unknown program {program:?}");
            return;
        };
        object.attached.retain(|s| s.stage != compiled.stage);
        object.attached.push(compiled);
    }

    fn link_program(&mut self, program: RawProgram) -> Result<(), String> {
        let Some(object) = self.programs.get(&program) else {
            log::warn!("wgpu backend: link of unknown program {program:?}");
            return Err(format!("unknown program {program:?}"));
        };
        let stage = |stage: ShaderStage| {
            object
                .attached
                .iter()
                .find(|s| s.stage == stage)
                .ok_or_else(|| format!("no compiled {} shader attached", stage.name()))
        };
        let vertex = stage(ShaderStage::Vertex)?;
        let fragment = stage(ShaderStage::Fragment)?;

        reflect::check_interface(vertex, fragment)?;
        let block = reflect::merge_blocks(vertex.uniforms.as_ref(), fragment.uniforms.as_ref())?;

        // Modules, layout and a pipeline for the reflected inputs all go
        // through device validation before the program counts as linked.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let linked = link(&self.device, vertex, fragment, block);
        let check_key = PipelineKey {
            program,
            topology: PrimitiveTopology::TriangleList,
            streams: linked
                .inputs
                .iter()
                .map(|&(location, ty)| StreamKey {
                    stride: ty.size_bytes(),
                    attributes: vec![(location, ty, 0)],
                })
                .collect(),
        };
        let check = build_pipeline(&self.device, self.color_format, &linked, &check_key);
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(err.to_string());
        }

        self.pipelines.retain(|key, _| key.program != program);
        self.pipelines.insert(check_key, check);
        if let Some(object) = self.programs.get_mut(&program) {
            object.linked = Some(linked);
        }
        Ok(())
    }

    fn delete_program(&mut self, program: RawProgram) {
        if self.programs.remove(&program).is_none() {
            log::warn!("wgpu backend: delete of unknown program {program:?}");
            return;
        }
        self.state.forget_program(program);
        self.pipelines.retain(|key, _| key.program != program);
    }

    fn active_uniforms(&self, program: RawProgram) -> Vec<ActiveUniform> {
        let Some(slot) = self.linked(program).and_then(|l| l.uniforms.as_ref()) else {
            return Vec::new();
        };
        slot.block
            .members
            .iter()
            .map(|m| ActiveUniform {
                name: m.name.clone(),
                ty: m.ty,
            })
            .collect()
    }

    fn uniform_location(&self, program: RawProgram, name: &str) -> Option<UniformLocation> {
        let slot = self.linked(program)?.uniforms.as_ref()?;
        slot.block.member_named(name).map(|m| UniformLocation(m.offset))
    }

    fn use_program(&mut self, program: Option<RawProgram>) {
        if let Some(p) = program {
            if self.linked(p).is_none() {
                log::warn!("wgpu backend: use of unknown or unlinked program {p:?}");
                return;
            }
        }
        self.state.program = program;
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: &UniformValue) {
        let Some(location) = location else { return };
        let Some(program) = self.state.program else {
            log::warn!("wgpu backend: uniform write with no program in use");
            return;
        };
        let Some(slot) = self
            .programs
            .get_mut(&program)
            .and_then(|p| p.linked.as_mut())
            .and_then(|l| l.uniforms.as_mut())
        else {
            log::warn!("wgpu backend: program {program:?} has no uniforms");
            return;
        };
        let Some(member) = slot.block.member_at(location.0) else {
            log::warn!("wgpu backend: no uniform at location {}", location.0);
            return;
        };
        if member.ty != value.ty() {
            log::warn!(
                "wgpu backend: uniform `{}` is {:?}; ignoring {:?} value",
                member.name,
                member.ty,
                value.ty()
            );
            return;
        }

        let bytes = value.as_bytes();
        let start = location.0 as usize;
        let Some(dst) = slot.shadow.get_mut(start..start + bytes.len()) else { return };
        dst.copy_from_slice(bytes);
        slot.dirty = true;
    }

    fn create_buffer(&mut self) -> RawBuffer {
        let buffer = RawBuffer::new(self.alloc());
        self.buffers.insert(buffer, BufferObject::default());
        buffer
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<RawBuffer>) {
        if let Some(b) = buffer {
            if !self.buffers.contains_key(&b) {
                log::warn!("wgpu backend: bind of unknown buffer {b:?}");
                return;
            }
        }
        self.state.bind_buffer(target, buffer);
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let Some(id) = self.state.bound_buffer(target) else {
            log::warn!("wgpu backend: buffer data with nothing bound to {target:?}");
            return;
        };
        let Some(object) = self.buffers.get_mut(&id) else { return };

        log::trace!("wgpu backend: {} bytes into {id:?} ({usage:?})", data.len());
        object.len = data.len() as u64;
        if data.is_empty() {
            object.gpu = None;
            return;
        }

        let bytes: Cow<'_, [u8]> = if object.len % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            Cow::Borrowed(data)
        } else {
            let mut padded = data.to_vec();
            padded.resize(object.len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize, 0);
            Cow::Owned(padded)
        };

        // A buffer read by a recorded draw keeps its contents until encoded.
        let reusable = !object.in_flight
            && object.gpu.as_ref().is_some_and(|b| b.size() >= bytes.len() as u64);
        if !reusable {
            object.gpu = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("fractal buffer"),
                size: bytes.len() as u64,
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::INDEX
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            object.in_flight = false;
        }
        if let Some(buffer) = &object.gpu {
            self.queue.write_buffer(buffer, 0, &bytes);
        }
    }

    fn delete_buffer(&mut self, buffer: RawBuffer) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("wgpu backend: delete of unknown buffer {buffer:?}");
            return;
        }
        self.state.forget_buffer(buffer);
    }

    fn create_vertex_array(&mut self) -> RawVertexArray {
        let vertex_array = RawVertexArray::new(self.alloc());
        self.state
            .vertex_arrays
            .insert(vertex_array, VertexArrayState::default());
        vertex_array
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<RawVertexArray>) {
        if let Some(va) = vertex_array {
            if !self.state.vertex_arrays.contains_key(&va) {
                log::warn!("wgpu backend: bind of unknown vertex array {va:?}");
                return;
            }
        }
        self.state.vertex_array = vertex_array;
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        match self.state.bound_vertex_array_mut() {
            Some(state) => state.enable(index),
            None => log::warn!("wgpu backend: enable of attribute {index} with no vertex array bound"),
        }
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, components: u32, stride: u32, offset: u32) {
        self.describe(ScalarKind::Float, index, components, stride, offset);
    }

    fn vertex_attrib_pointer_i32(&mut self, index: u32, components: u32, stride: u32, offset: u32) {
        self.describe(ScalarKind::Int, index, components, stride, offset);
    }

    fn delete_vertex_array(&mut self, vertex_array: RawVertexArray) {
        if !self.state.vertex_arrays.contains_key(&vertex_array) {
            log::warn!("wgpu backend: delete of unknown vertex array {vertex_array:?}");
            return;
        }
        self.state.forget_vertex_array(vertex_array);
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32) {
        if count == 0 {
            return;
        }
        match self.prepare_draw(topology, count) {
            Ok(draw) => self.pending.push(draw),
            Err(msg) => log::warn!("wgpu backend: draw skipped: {msg}"),
        }
    }
}

/// Splits the enabled attributes into vertex buffer slots, in slot order.
fn group_streams(state: &VertexArrayState) -> Vec<(RawBuffer, StreamKey)> {
    let mut streams: Vec<(RawBuffer, StreamKey)> = Vec::new();
    for (slot, binding) in state.enabled_attributes() {
        let attribute = (slot, binding.ty, binding.offset);
        match streams
            .iter_mut()
            .find(|(buffer, key)| *buffer == binding.buffer && key.stride == binding.stride)
        {
            Some((_, key)) => key.attributes.push(attribute),
            None => streams.push((
                binding.buffer,
                StreamKey {
                    stride: binding.stride,
                    attributes: vec![attribute],
                },
            )),
        }
    }
    streams
}

fn link(
    device: &wgpu::Device,
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    block: Option<UniformBlock>,
) -> LinkedProgram {
    let module = |stage: &CompiledStage| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage.stage {
                ShaderStage::Vertex => "fractal vertex stage",
                ShaderStage::Fragment => "fractal fragment stage",
            }),
            source: wgpu::ShaderSource::Wgsl(stage.source.as_str().into()),
        })
    };

    let uniforms = block.map(|block| {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fractal uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: reflect::UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(u64::from(block.size)),
                },
                count: None,
            }],
        });
        UniformSlot {
            shadow: vec![0; block.size as usize],
            block,
            bind_group_layout,
            dirty: true,
            gpu: None,
            in_flight: false,
        }
    });

    let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
        uniforms.iter().map(|u| &u.bind_group_layout).collect();
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("fractal pipeline layout"),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    });

    LinkedProgram {
        vertex: module(vertex),
        fragment: module(fragment),
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        inputs: vertex.inputs.clone(),
        layout,
        uniforms,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    program: &LinkedProgram,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    let attributes: Vec<Vec<wgpu::VertexAttribute>> = key
        .streams
        .iter()
        .map(|stream| {
            stream
                .attributes
                .iter()
                .map(|(slot, ty, offset)| wgpu::VertexAttribute {
                    format: vertex_format(*ty),
                    offset: u64::from(*offset),
                    shader_location: *slot,
                })
                .collect()
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .streams
        .iter()
        .zip(&attributes)
        .map(|(stream, attributes)| wgpu::VertexBufferLayout {
            array_stride: u64::from(stream.stride),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    let topology = match key.topology {
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("fractal pipeline"),
        layout: Some(&program.layout),

        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some(program.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some(program.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn vertex_format(ty: ShaderType) -> wgpu::VertexFormat {
    match ty {
        ShaderType::Int => wgpu::VertexFormat::Sint32,
        ShaderType::Int2 => wgpu::VertexFormat::Sint32x2,
        ShaderType::Int3 => wgpu::VertexFormat::Sint32x3,
        ShaderType::Int4 => wgpu::VertexFormat::Sint32x4,
        ShaderType::Float => wgpu::VertexFormat::Float32,
        ShaderType::Float2 => wgpu::VertexFormat::Float32x2,
        ShaderType::Float3 => wgpu::VertexFormat::Float32x3,
        ShaderType::Float4 => wgpu::VertexFormat::Float32x4,
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use std::rc::Rc;

    use super::*;
    use crate::coords::Viewport;
    use crate::fractal::{FRACTAL_BOUNDS, FRACTAL_SHADER, FractalPipeline, QUAD_VERTICES};
    use crate::graphics::state::AttributeBinding;
    use crate::graphics::{
        AttributeLayout, ShaderError, ShaderProgram, ShaderSource, VertexArray, VertexBuffer,
    };

    fn buffer(id: u32) -> RawBuffer {
        RawBuffer::new(NonZeroU32::new(id).unwrap())
    }

    fn binding(buffer: RawBuffer, ty: ShaderType, stride: u32, offset: u32) -> AttributeBinding {
        AttributeBinding {
            buffer,
            ty,
            stride,
            offset,
            enabled: true,
        }
    }

    #[test]
    fn interleaved_attributes_share_one_stream() {
        let mut state = VertexArrayState::default();
        state.attributes.insert(0, binding(buffer(1), ShaderType::Float3, 20, 0));
        state.attributes.insert(1, binding(buffer(1), ShaderType::Float2, 20, 12));
        state.attributes.insert(2, binding(buffer(2), ShaderType::Int, 4, 0));

        let streams = group_streams(&state);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].0, buffer(1));
        assert_eq!(
            streams[0].1.attributes,
            vec![(0, ShaderType::Float3, 0), (1, ShaderType::Float2, 12)]
        );
        assert_eq!(streams[1].1.stride, 4);
    }

    #[test]
    fn disabled_attributes_are_not_streamed() {
        let mut state = VertexArrayState::default();
        let mut disabled = binding(buffer(1), ShaderType::Float4, 16, 0);
        disabled.enabled = false;
        state.attributes.insert(0, disabled);

        assert!(group_streams(&state).is_empty());
    }

    #[test]
    fn integer_types_map_to_signed_formats() {
        assert_eq!(vertex_format(ShaderType::Int2), wgpu::VertexFormat::Sint32x2);
        assert_eq!(vertex_format(ShaderType::Float4), wgpu::VertexFormat::Float32x4);
    }

    fn backend() -> WgpuBackend {
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        WgpuBackend::new(device, queue, wgpu::TextureFormat::Rgba8UnormSrgb)
    }

    /// Encodes and submits the pending draws into a small offscreen target.
    fn encode_frame(gl: &mut WgpuBackend) {
        let scope = gl.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = gl.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gl.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gl
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        gl.encode(&mut RenderTarget::new(&mut encoder, &view));
        gl.queue.submit([encoder.finish()]);
        assert_eq!(pollster::block_on(scope.pop()).map(|e| e.to_string()), None);
    }

    fn shadow(gl: &WgpuBackend, pipeline: &FractalPipeline) -> Vec<u8> {
        let program = pipeline.shader().raw().unwrap();
        gl.linked(program).unwrap().uniforms.as_ref().unwrap().shadow.clone()
    }

    #[test]
    fn fractal_frames_render_on_a_device() {
        let mut gl = backend();
        let pipeline = FractalPipeline::create(&mut gl).unwrap();
        // Linking already built the pipeline the quad layout needs.
        assert_eq!(gl.pipelines.len(), 1);

        pipeline.submit(&mut gl, 800, 600);
        pipeline.submit(&mut gl, 600, 800);
        assert_eq!(gl.pending.len(), 2);
        assert_eq!(gl.pipelines.len(), 1);
        assert_eq!(gl.pending[0].pipeline, gl.pending[1].pipeline);
        assert_ne!(gl.pending[0].bind_group, gl.pending[1].bind_group);

        let tall = FRACTAL_BOUNDS
            .aspect_corrected(Viewport::new(600.0, 800.0))
            .unwrap()
            .matrix();
        assert_eq!(shadow(&gl, &pipeline), bytemuck::bytes_of(&tall));

        let last_bind_group = gl.pending[1].bind_group.clone();
        encode_frame(&mut gl);
        assert_eq!(gl.pending.len(), 0);

        // Nothing is in flight after encoding, so the next frame reuses the block.
        pipeline.submit(&mut gl, 800, 600);
        assert_eq!(gl.pending[0].bind_group, last_bind_group);
        encode_frame(&mut gl);

        pipeline.destroy(&mut gl);
        assert_eq!(gl.live_objects(), 0);
        assert!(gl.pipelines.is_empty());
    }

    #[test]
    fn unwritten_fragment_input_fails_to_link() {
        let mut gl = backend();
        let source = ShaderSource {
            vertex: FRACTAL_SHADER.vertex,
            fragment: r#"
                @fragment
                fn fs_main(@location(3) x: vec4<f32>) -> @location(0) vec4<f32> {
                    return x;
                }
            "#,
        };

        let err = ShaderProgram::create(&mut gl, &source).unwrap_err();
        assert!(
            matches!(&err, ShaderError::Link { log } if log.contains("@location(3)")),
            "{err}"
        );
        assert_eq!(gl.live_objects(), 0);
        assert!(gl.pipelines.is_empty());
    }

    #[test]
    fn draw_past_the_index_buffer_is_skipped() {
        let mut gl = backend();
        let pipeline = FractalPipeline::create(&mut gl).unwrap();

        pipeline.shader().bind(&mut gl);
        pipeline.vertex_array().bind(&mut gl);
        gl.draw_elements(PrimitiveTopology::TriangleList, 7);
        assert_eq!(gl.pending.len(), 0);

        gl.draw_elements(PrimitiveTopology::TriangleList, 6);
        assert_eq!(gl.pending.len(), 1);
        gl.discard_pending();
        pipeline.destroy(&mut gl);
    }

    #[test]
    fn integer_attribute_for_float_input_is_skipped() {
        let mut gl = backend();
        let pipeline = FractalPipeline::create(&mut gl).unwrap();

        let mut vertex_array = VertexArray::create(&mut gl);
        vertex_array.bind(&mut gl);
        let mut vertex_buffer = VertexBuffer::create(&mut gl);
        vertex_buffer.set_layout(Rc::new(AttributeLayout::new([ShaderType::Int4])));
        vertex_buffer.upload(&mut gl, &[[0i32; 4]; 4]);
        vertex_array.attach_vertex_buffer(&mut gl, &vertex_buffer);
        vertex_array.attach_index_buffer(&mut gl, pipeline.index_buffer());

        pipeline.shader().bind(&mut gl);
        gl.draw_elements(PrimitiveTopology::TriangleList, 6);
        assert_eq!(gl.pending.len(), 0);
        assert_eq!(gl.pipelines.len(), 1);

        vertex_array.destroy(&mut gl);
        vertex_buffer.destroy(&mut gl);
        pipeline.destroy(&mut gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn reupload_while_drawn_allocates_a_fresh_buffer() {
        let mut gl = backend();
        let pipeline = FractalPipeline::create(&mut gl).unwrap();
        let id = pipeline.vertex_buffer().raw().unwrap();

        pipeline.submit(&mut gl, 800, 600);
        let drawn = gl.pending[0].vertex_buffers[0].clone();
        assert!(gl.buffers[&id].in_flight);

        pipeline.vertex_buffer().upload(&mut gl, &QUAD_VERTICES);
        let current = gl.buffers[&id].gpu.clone().unwrap();
        assert_ne!(current, drawn);
        assert_eq!(gl.pending[0].vertex_buffers[0], drawn);

        gl.discard_pending();
        assert!(!gl.buffers[&id].in_flight);
        let program = pipeline.shader().raw().unwrap();
        assert!(!gl.linked(program).unwrap().uniforms.as_ref().unwrap().in_flight);

        pipeline.vertex_buffer().upload(&mut gl, &QUAD_VERTICES);
        assert_eq!(gl.buffers[&id].gpu.as_ref(), Some(&current));
        pipeline.destroy(&mut gl);
    }
}
