use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::transform::safe_normalize;

/// Names the local axes that mean "forward", "right" and "up".
///
/// Defaults to forward +X, right +Y, up +Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self {
            forward: Vec3::X,
            right: Vec3::Y,
            up: Vec3::Z,
        }
    }
}

impl CoordinateSystem {
    /// Builds a system from arbitrary axes. Zero-length axes fall back to the
    /// default axis of the same role.
    #[must_use]
    pub fn new(forward: Vec3, right: Vec3, up: Vec3) -> Self {
        let default = Self::default();
        Self {
            forward: safe_normalize(forward, default.forward),
            right: safe_normalize(right, default.right),
            up: safe_normalize(up, default.up),
        }
    }
}
