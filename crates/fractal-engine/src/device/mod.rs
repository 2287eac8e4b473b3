//! wgpu device and window surface: adapter selection, surface configuration
//! and resize, per-frame acquisition and presentation.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
