//! Fractal engine crate.
//!
//! A GPU resource layer (shader programs, buffers, vertex arrays) written
//! against a small bind-then-operate command trait, a wgpu implementation of
//! that trait, and the Mandelbrot pipeline built on top. Also owns the
//! platform pieces the viewer needs: window runtime, device setup, timing,
//! logging.

pub mod core;
pub mod device;
pub mod time;
pub mod window;

pub mod coords;
pub mod fractal;
pub mod graphics;
pub mod logging;
pub mod math;
pub mod render;
