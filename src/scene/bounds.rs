use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene::transform::Transform;

/// Combined axis-aligned box and bounding sphere sharing one center.
///
/// Renderers use the box for tight culling and the sphere for cheap
/// rejection. An invalid (empty) bounds has a negative radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxSphere {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub radius: f32,
}

impl Default for BoundingBoxSphere {
    fn default() -> Self {
        Self::INVALID
    }
}

impl BoundingBoxSphere {
    pub const INVALID: Self = Self {
        center: Vec3::ZERO,
        half_extents: Vec3::ZERO,
        radius: -1.0,
    };

    /// Bounds of the box `[min, max]`, with the sphere enclosing it.
    #[must_use]
    pub fn from_box(min: Vec3, max: Vec3) -> Self {
        let half_extents = (max - min).abs() * 0.5;
        Self {
            center: (min + max) * 0.5,
            half_extents,
            radius: half_extents.length(),
        }
    }

    #[must_use]
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            half_extents: Vec3::splat(radius.abs()),
            radius: radius.abs(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.radius >= 0.0 && self.center.is_finite() && self.half_extents.is_finite()
    }

    #[must_use]
    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    /// Transforms local bounds into the space described by `transform`.
    ///
    /// The box is re-fitted around the rotated box (absolute rotation matrix),
    /// the sphere scales with the largest axis scale. Invalid bounds stay invalid.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        if !self.is_valid() {
            return Self::INVALID;
        }

        let rotation = Mat3::from_quat(transform.rotation);
        let abs_rotation = Mat3::from_cols(
            rotation.x_axis.abs(),
            rotation.y_axis.abs(),
            rotation.z_axis.abs(),
        );

        Self {
            center: transform.transform_point(self.center),
            half_extents: abs_rotation * (transform.scale.abs() * self.half_extents),
            radius: self.radius * transform.max_scale(),
        }
    }
}
