use glam::Mat4;

use crate::coords::Viewport;

/// Orthographic projection of the box `[left, right] × [bottom, top] × [-1, 1]`
/// onto the normalized device cube (GL convention).
pub fn make_orthogonal_projection(left: f32, right: f32, bottom: f32, top: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(left, right, bottom, top, -1.0, 1.0)
}

/// Visible region of a plane, in plane units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl ProjectionBounds {
    pub const fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Scales the horizontal extent by the viewport's width / height ratio so
    /// one plane unit covers the same number of pixels on both axes.
    ///
    /// Returns `None` for a zero-area or non-finite viewport.
    pub fn aspect_corrected(self, viewport: Viewport) -> Option<Self> {
        let ratio = viewport.aspect_ratio()?;
        Some(Self {
            left: self.left * ratio,
            right: self.right * ratio,
            ..self
        })
    }

    pub fn matrix(&self) -> Mat4 {
        make_orthogonal_projection(self.left, self.right, self.bottom, self.top)
    }
}
