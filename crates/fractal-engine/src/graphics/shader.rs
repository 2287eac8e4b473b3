use std::collections::HashMap;
use std::fmt;

use glam::{IVec2, IVec3, IVec4, Mat4, Vec2, Vec3, Vec4};

use super::api::{GraphicsApi, RawProgram, RawShader, ShaderStage, UniformLocation};
use super::types::UniformValue;

/// Source text of a vertex + fragment program pair.
#[derive(Debug, Copy, Clone)]
pub struct ShaderSource<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// Failure while building a [`ShaderProgram`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// A stage did not compile; `log` is the compiler diagnostic.
    Compile { stage: ShaderStage, log: String },
    /// Both stages compiled but the program did not link.
    Link { log: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Compile { stage, log } => {
                write!(f, "{} shader compilation failed: {}", stage.name(), log)
            }
            ShaderError::Link { log } => write!(f, "shader program linking failed: {}", log),
        }
    }
}

impl std::error::Error for ShaderError {}

/// A linked vertex + fragment program.
///
/// Uniform locations are resolved once at creation. Every setter activates
/// the program before writing, so callers do not need to bind first.
/// Release with [`ShaderProgram::destroy`].
#[derive(Debug)]
pub struct ShaderProgram {
    handle: Option<RawProgram>,
    locations: HashMap<String, UniformLocation>,
}

impl ShaderProgram {
    /// Compiles both stages and links them.
    ///
    /// Every object created by a failed attempt is released before returning.
    pub fn create(gl: &mut dyn GraphicsApi, source: &ShaderSource<'_>) -> Result<Self, ShaderError> {
        let vertex = compile_stage(gl, ShaderStage::Vertex, source.vertex)?;
        let fragment = match compile_stage(gl, ShaderStage::Fragment, source.fragment) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(vertex);
                return Err(err);
            }
        };

        let handle = gl.create_program();
        gl.attach_shader(handle, vertex);
        gl.attach_shader(handle, fragment);
        let linked = gl.link_program(handle);

        // The program keeps what it needs once linked.
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if let Err(log) = linked {
            gl.delete_program(handle);
            log::error!("shader program linking failed: {log}");
            return Err(ShaderError::Link { log });
        }

        let mut locations = HashMap::new();
        for uniform in gl.active_uniforms(handle) {
            match gl.uniform_location(handle, &uniform.name) {
                Some(location) => {
                    log::debug!(
                        "program {:?}: uniform `{}` ({:?}) has location {}",
                        handle,
                        uniform.name,
                        uniform.ty,
                        location.0
                    );
                    locations.insert(uniform.name, location);
                }
                None => log::debug!(
                    "program {:?}: uniform `{}` has no location",
                    handle,
                    uniform.name
                ),
            }
        }

        Ok(Self {
            handle: Some(handle),
            locations,
        })
    }

    /// Releases the GPU program.
    pub fn destroy(mut self, gl: &mut dyn GraphicsApi) {
        if let Some(handle) = self.handle.take() {
            gl.delete_program(handle);
        }
    }

    pub fn raw(&self) -> Option<RawProgram> {
        self.handle
    }

    /// Cached location of `name`, if the program declares it.
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.locations.get(name).copied()
    }

    pub fn bind(&self, gl: &mut dyn GraphicsApi) {
        gl.use_program(self.handle);
    }

    pub fn unbind(gl: &mut dyn GraphicsApi) {
        gl.use_program(None);
    }

    /// Sets a sampler uniform to texture unit `slot`.
    pub fn uniform_sampler(&self, gl: &mut dyn GraphicsApi, name: &str, slot: u32) {
        match i32::try_from(slot) {
            Ok(slot) => self.uniform_i32(gl, name, slot),
            Err(_) => log::warn!("texture unit {slot} for `{name}` is out of range; ignored"),
        }
    }

    pub fn uniform_i32(&self, gl: &mut dyn GraphicsApi, name: &str, value: i32) {
        self.set(gl, name, UniformValue::Int(value));
    }

    pub fn uniform_ivec2(&self, gl: &mut dyn GraphicsApi, name: &str, value: IVec2) {
        self.set(gl, name, UniformValue::Int2(value));
    }

    pub fn uniform_ivec3(&self, gl: &mut dyn GraphicsApi, name: &str, value: IVec3) {
        self.set(gl, name, UniformValue::Int3(value));
    }

    pub fn uniform_ivec4(&self, gl: &mut dyn GraphicsApi, name: &str, value: IVec4) {
        self.set(gl, name, UniformValue::Int4(value));
    }

    pub fn uniform_f32(&self, gl: &mut dyn GraphicsApi, name: &str, value: f32) {
        self.set(gl, name, UniformValue::Float(value));
    }

    pub fn uniform_vec2(&self, gl: &mut dyn GraphicsApi, name: &str, value: Vec2) {
        self.set(gl, name, UniformValue::Float2(value));
    }

    pub fn uniform_vec3(&self, gl: &mut dyn GraphicsApi, name: &str, value: Vec3) {
        self.set(gl, name, UniformValue::Float3(value));
    }

    pub fn uniform_vec4(&self, gl: &mut dyn GraphicsApi, name: &str, value: Vec4) {
        self.set(gl, name, UniformValue::Float4(value));
    }

    pub fn uniform_mat4(&self, gl: &mut dyn GraphicsApi, name: &str, value: &Mat4) {
        self.set(gl, name, UniformValue::Mat4(*value));
    }

    fn set(&self, gl: &mut dyn GraphicsApi, name: &str, value: UniformValue) {
        gl.use_program(self.handle);
        gl.set_uniform(self.location(name), &value);
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("shader program {handle:?} dropped without destroy(); GPU object leaked");
        }
    }
}

fn compile_stage(
    gl: &mut dyn GraphicsApi,
    stage: ShaderStage,
    source: &str,
) -> Result<RawShader, ShaderError> {
    let shader = gl.create_shader(stage);
    match gl.compile_shader(shader, source) {
        Ok(()) => Ok(shader),
        Err(log) => {
            gl.delete_shader(shader);
            log::error!("{} shader compilation failed: {log}", stage.name());
            Err(ShaderError::Compile { stage, log })
        }
    }
}
