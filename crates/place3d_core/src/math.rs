//! Math utilities
//!
//! Re-exports glam with the axis helpers placement needs

pub use glam::*;

/// One of the three world axes, signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Axis with the largest absolute component and the sign of that component.
///
/// Ties resolve in x, y, z order. Returns `None` for a zero or non-finite vector.
pub fn dominant_axis(v: Vec3) -> Option<(Axis, i32)> {
    if !v.is_finite() || v == Vec3::ZERO {
        return None;
    }

    let abs = v.abs();
    let (axis, component) = if abs.x >= abs.y && abs.x >= abs.z {
        (Axis::X, v.x)
    } else if abs.y >= abs.z {
        (Axis::Y, v.y)
    } else {
        (Axis::Z, v.z)
    };

    Some((axis, if component > 0.0 { 1 } else { -1 }))
}
