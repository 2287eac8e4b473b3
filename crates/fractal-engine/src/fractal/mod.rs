//! The Mandelbrot renderer: one full-screen quad, one shader program.

pub mod escape;
mod pipeline;

pub use pipeline::{FractalPipeline, QuadVertex, FRACTAL_BOUNDS, QUAD_INDICES, QUAD_VERTICES};

use crate::graphics::ShaderSource;

/// Name of the `mat4x4<f32>` uniform holding the plane-to-clip projection.
pub const PROJECTION_UNIFORM: &str = "projection";

/// Vertex and fragment stages of the fractal program.
pub const FRACTAL_SHADER: ShaderSource<'static> = ShaderSource {
    vertex: include_str!("shaders/fractal.vert.wgsl"),
    fragment: include_str!("shaders/fractal.frag.wgsl"),
};
