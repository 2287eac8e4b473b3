//! Projection helpers on top of `glam`.

mod projection;

pub use projection::{make_orthogonal_projection, ProjectionBounds};
