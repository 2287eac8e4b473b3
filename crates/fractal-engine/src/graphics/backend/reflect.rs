//! WGSL front end: parse, validate and reflect one shader stage with naga.

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::graphics::api::ShaderStage;
use crate::graphics::types::{ScalarKind, ShaderType, UniformType};

/// One member of a uniform block. Its byte offset doubles as its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub ty: UniformType,
}

/// The single `var<uniform>` a program may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub size: u32,
    pub members: Vec<UniformMember>,
}

impl UniformBlock {
    pub fn member_at(&self, offset: u32) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.offset == offset)
    }

    pub fn member_named(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A validated stage, ready to hand to wgpu.
#[derive(Debug, Clone)]
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub source: String,
    pub entry_point: String,
    /// `@location` inputs of the entry point.
    pub inputs: Vec<(u32, ShaderType)>,
    /// `@location` outputs; only meaningful for the vertex stage.
    pub outputs: Vec<(u32, ShaderType)>,
    pub uniforms: Option<UniformBlock>,
}

/// Group and binding the uniform block must be declared at.
pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const UNIFORM_BINDING: u32 = 0;

/// Shader capabilities a device with `features` accepts, limited to what a
/// stage without texture or storage bindings can use.
pub(crate) fn shader_capabilities(features: wgpu::Features) -> Capabilities {
    let mut caps = Capabilities::empty();
    caps.set(Capabilities::IMMEDIATES, features.contains(wgpu::Features::IMMEDIATES));
    caps.set(Capabilities::FLOAT64, features.contains(wgpu::Features::SHADER_F64));
    caps.set(Capabilities::SHADER_FLOAT16, features.contains(wgpu::Features::SHADER_F16));
    caps.set(Capabilities::SHADER_INT64, features.contains(wgpu::Features::SHADER_INT64));
    caps.set(
        Capabilities::PRIMITIVE_INDEX,
        features.contains(wgpu::Features::SHADER_PRIMITIVE_INDEX),
    );
    caps.set(Capabilities::CLIP_DISTANCE, features.contains(wgpu::Features::CLIP_DISTANCES));
    caps.set(
        Capabilities::DUAL_SOURCE_BLENDING,
        features.contains(wgpu::Features::DUAL_SOURCE_BLENDING),
    );
    caps.set(
        Capabilities::EARLY_DEPTH_TEST,
        features.contains(wgpu::Features::SHADER_EARLY_DEPTH_TEST),
    );
    caps
}

pub(crate) fn compile_stage(
    stage: ShaderStage,
    source: &str,
    capabilities: Capabilities,
) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), capabilities)
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let Some(entry) = module.entry_points.iter().find(|ep| ep.stage == wanted) else {
        return Err(format!("no @{} entry point", stage.name()));
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_locations(&module, arg.binding.as_ref(), arg.ty, &mut inputs);
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, result.binding.as_ref(), result.ty, &mut outputs);
    }

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        uniforms: reflect_uniforms(&module)?,
    })
}

/// Combines the blocks of both stages. Declaring one in both is allowed only
/// when the declarations agree.
pub(crate) fn merge_blocks(
    vertex: Option<&UniformBlock>,
    fragment: Option<&UniformBlock>,
) -> Result<Option<UniformBlock>, String> {
    match (vertex, fragment) {
        (Some(v), Some(f)) if v != f => {
            Err("vertex and fragment stages declare different uniform blocks".to_string())
        }
        (Some(block), _) | (None, Some(block)) => Ok(Some(block.clone())),
        (None, None) => Ok(None),
    }
}

/// Checks that every fragment input is written by the vertex stage with the
/// same type.
pub(crate) fn check_interface(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<(), String> {
    for (location, ty) in &fragment.inputs {
        match vertex.outputs.iter().find(|(l, _)| l == location) {
            Some((_, written)) if written == ty => {}
            Some((_, written)) => {
                return Err(format!(
                    "fragment input @location({location}) is {ty:?} but the vertex stage writes {written:?}"
                ));
            }
            None => {
                return Err(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                ));
            }
        }
    }
    Ok(())
}

/// Appends the `@location` bindings of an argument or result, looking through
/// one level of struct.
fn collect_locations(
    module: &naga::Module,
    binding: Option<&naga::Binding>,
    ty: naga::Handle<naga::Type>,
    out: &mut Vec<(u32, ShaderType)>,
) {
    if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
        for member in members {
            collect_locations(module, member.binding.as_ref(), member.ty, out);
        }
        return;
    }
    let Some(naga::Binding::Location { location, .. }) = binding else { return };
    let (scalar, components) = match &module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) => (*scalar, 1),
        naga::TypeInner::Vector { size, scalar } => (*scalar, *size as u32),
        _ => return,
    };
    if let Some(ty) = scalar_kind(scalar).and_then(|kind| ShaderType::from_parts(kind, components)) {
        out.push((*location, ty));
    }
}

fn reflect_uniforms(module: &naga::Module) -> Result<Option<UniformBlock>, String> {
    let mut block = None;

    for (_, var) in module.global_variables.iter() {
        match var.space {
            naga::AddressSpace::Uniform => {}
            naga::AddressSpace::Handle => {
                return Err("texture and sampler bindings are not supported".to_string());
            }
            naga::AddressSpace::Storage { .. } => {
                return Err("storage buffers are not supported".to_string());
            }
            _ => continue,
        }
        if block.is_some() {
            return Err("only one uniform block is supported".to_string());
        }

        let name = var.name.clone().unwrap_or_default();
        match &var.binding {
            Some(b) if b.group == UNIFORM_GROUP && b.binding == UNIFORM_BINDING => {}
            _ => {
                return Err(format!(
                    "uniform `{name}` must be declared at @group({UNIFORM_GROUP}) @binding({UNIFORM_BINDING})"
                ));
            }
        }

        let inner = &module.types[var.ty].inner;
        let members = match inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| UniformMember {
                    name: m.name.clone().unwrap_or_default(),
                    offset: m.offset,
                    ty: uniform_type(&module.types[m.ty].inner),
                })
                .collect(),
            other => vec![UniformMember {
                name,
                offset: 0,
                ty: uniform_type(other),
            }],
        };

        block = Some(UniformBlock {
            size: inner.size(module.to_ctx()),
            members,
        });
    }

    Ok(block)
}

fn scalar_kind(scalar: naga::Scalar) -> Option<ScalarKind> {
    match (scalar.kind, scalar.width) {
        (naga::ScalarKind::Sint, 4) => Some(ScalarKind::Int),
        (naga::ScalarKind::Float, 4) => Some(ScalarKind::Float),
        _ => None,
    }
}

fn uniform_type(inner: &naga::TypeInner) -> UniformType {
    let basic = |scalar: naga::Scalar, components: u32| {
        scalar_kind(scalar)
            .and_then(|kind| ShaderType::from_parts(kind, components))
            .map_or(UniformType::Opaque, UniformType::Basic)
    };
    match inner {
        naga::TypeInner::Scalar(scalar) => basic(*scalar, 1),
        naga::TypeInner::Vector { size, scalar } => basic(*scalar, *size as u32),
        naga::TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            scalar,
        } if scalar_kind(*scalar) == Some(ScalarKind::Float) => UniformType::Mat4,
        _ => UniformType::Opaque,
    }
}
