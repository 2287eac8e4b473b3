//! Frame-level rendering handles passed to draw callbacks.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
