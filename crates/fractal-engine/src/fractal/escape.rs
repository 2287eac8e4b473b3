//! Host-side reference of the escape-time evaluation run by the fragment
//! stage. Both must agree; the tests below pin the contract.

use glam::{Vec2, Vec4};

pub const MAX_ITERATIONS: u32 = 50;

/// `|z|²` above which a point is considered escaped.
pub const ESCAPE_RADIUS_SQUARED: f32 = 4.0;

/// Iteration at which `c` escapes, or `None` if it stays bounded.
///
/// Iteration starts from `z = c` (the first step from zero is implied), so
/// the returned index counts the steps after that one.
pub fn escape_iterations(c: Vec2) -> Option<u32> {
    let mut z = c;
    for n in 0..MAX_ITERATIONS {
        z = Vec2::new(z.x * z.x - z.y * z.y, 2.0 * z.x * z.y) + c;
        if z.length_squared() > ESCAPE_RADIUS_SQUARED {
            return Some(n);
        }
    }
    None
}

/// Color of a point escaping at iteration `n`. Not normalized.
pub fn palette(n: u32) -> Vec4 {
    let t = n as f32 / MAX_ITERATIONS as f32;
    let s = 1.0 - t;
    Vec4::new(
        9.0 * s * t * t * t,
        15.0 * s * s * t * t,
        8.5 * s * s * s * t,
        1.0,
    )
}

pub fn escape_color(c: Vec2) -> Vec4 {
    match escape_iterations(c) {
        Some(n) => palette(n),
        None => Vec4::W,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_never_escapes() {
        assert_eq!(escape_iterations(Vec2::ZERO), None);
        assert_eq!(escape_color(Vec2::ZERO), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn immediate_escape_renders_black() {
        assert_eq!(escape_iterations(Vec2::new(1.0, 1.0)), Some(0));
        assert_eq!(escape_color(Vec2::new(1.0, 1.0)), Vec4::W);
    }

    #[test]
    fn period_two_cycle_stays_bounded() {
        assert_eq!(escape_iterations(Vec2::new(-1.0, 0.0)), None);
    }

    #[test]
    fn slow_escape_uses_the_polynomial() {
        // 0.5 → 0.75 → 1.0625 → 1.6289 → 3.1533
        let c = Vec2::new(0.5, 0.0);
        assert_eq!(escape_iterations(c), Some(3));

        let t = 3.0f32 / 50.0;
        let expected = Vec4::new(
            9.0 * (1.0 - t) * t.powi(3),
            15.0 * (1.0 - t).powi(2) * t.powi(2),
            8.5 * (1.0 - t).powi(3) * t,
            1.0,
        );
        assert!(escape_color(c).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn palette_is_opaque_and_nonnegative() {
        for n in 0..MAX_ITERATIONS {
            let color = palette(n);
            assert_eq!(color.w, 1.0);
            assert!(color.x >= 0.0 && color.y >= 0.0 && color.z >= 0.0);
        }
    }
}
