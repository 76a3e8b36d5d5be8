use glam::{Affine3A, EulerRot, Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Scale components smaller than this are treated as collapsed when inverting.
const SCALE_EPSILON: f32 = 1e-6;

/// Transform (TRS)
///
/// Position, rotation and per-axis scale. Used both for the local transform
/// (relative to the parent) and for the cached global transform of an object.
///
/// Composition deliberately avoids matrices: rotations multiply as
/// quaternions, scales multiply component-wise and positions go through
/// [`transform_point`](Transform::transform_point). Results are therefore
/// exactly reproducible for identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Maps a point from this transform's local space into its parent space.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.position
    }

    /// Maps a direction (no translation) into parent space.
    #[inline]
    #[must_use]
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.rotation * (self.scale * direction)
    }

    /// `self ∘ local`: the global transform of a child whose parent has the
    /// global transform `self`.
    #[inline]
    #[must_use]
    pub fn compose(&self, local: &Transform) -> Transform {
        Transform {
            position: self.transform_point(local.position),
            rotation: self.rotation * local.rotation,
            scale: self.scale * local.scale,
        }
    }

    /// Inverse of [`compose`](Self::compose): the local transform that yields
    /// `global` under a parent with the global transform `self`.
    ///
    /// Collapsed scale axes (near zero) invert to zero instead of infinity.
    #[must_use]
    pub fn make_local(&self, global: &Transform) -> Transform {
        let inv_rotation = self.rotation.inverse();
        let inv_scale = safe_recip(self.scale);
        Transform {
            position: inv_scale * (inv_rotation * (global.position - self.position)),
            rotation: (inv_rotation * global.rotation).normalize(),
            scale: global.scale * inv_scale,
        }
    }

    // ========================================================================
    // Getters & Helpers
    // ========================================================================

    /// 获取仿射矩阵 (Affine3A)
    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// 获取矩阵 (Mat4) - e.g. for upload by a renderer
    #[inline]
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from(self.to_affine())
    }

    /// Decomposes an affine matrix. Shear is lost.
    #[must_use]
    pub fn from_affine(matrix: &Affine3A) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Helper：设置欧拉角旋转
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    /// 获取当前的欧拉角 (XYZ 顺序)
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    /// Uniform scale approximation (largest absolute axis scale).
    #[inline]
    #[must_use]
    pub fn max_scale(&self) -> f32 {
        self.scale.abs().max_element()
    }

    /// Rotates so that `forward_axis` points at `target`.
    ///
    /// `target` and `up` live in the parent space. Degenerate inputs (target at
    /// the current position, or `up` parallel to the view direction) leave the
    /// rotation unchanged.
    pub fn look_at(&mut self, target: Vec3, up: Vec3, forward_axis: Vec3, up_axis: Vec3) {
        let Some(forward) = (target - self.position).try_normalize() else {
            return;
        };
        if forward.cross(up).length_squared() < 1e-4 {
            return;
        }

        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward).normalize();
        let world_basis = Mat3::from_cols(forward, new_up, right);

        let local_forward = safe_normalize(forward_axis, Vec3::X);
        let local_right = safe_normalize(local_forward.cross(up_axis), Vec3::Z);
        let local_up = local_right.cross(local_forward).normalize();
        let local_basis = Mat3::from_cols(local_forward, local_up, local_right);

        self.rotation = Quat::from_mat3(&(world_basis * local_basis.transpose())).normalize();
    }
}

/// Normalizes `v`, falling back to `fallback` for zero-length or non-finite input.
#[inline]
#[must_use]
pub fn safe_normalize(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}

#[inline]
fn safe_recip(v: Vec3) -> Vec3 {
    let recip = |s: f32| if s.abs() < SCALE_EPSILON { 0.0 } else { s.recip() };
    Vec3::new(recip(v.x), recip(v.y), recip(v.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn vec3_approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn compose_matches_affine_product() {
        let parent = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::splat(2.0),
        );
        let local = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));

        let composed = parent.compose(&local);
        let via_matrix = parent.to_affine() * local.to_affine();

        assert!(vec3_approx(composed.position, via_matrix.translation.into()));
        assert!(vec3_approx(composed.position, Vec3::new(1.0, 4.0, 3.0)));
    }

    #[test]
    fn make_local_inverts_compose() {
        let parent = Transform::new(
            Vec3::new(-4.0, 0.5, 2.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 0.5),
        );
        let global = Transform::new(Vec3::new(3.0, 3.0, 3.0), Quat::from_rotation_x(0.3), Vec3::ONE);

        let local = parent.make_local(&global);
        let back = parent.compose(&local);

        assert!(vec3_approx(back.position, global.position));
        assert!(back.rotation.abs_diff_eq(global.rotation, 1e-5));
        assert!(vec3_approx(back.scale, global.scale));
    }

    #[test]
    fn make_local_with_collapsed_scale_stays_finite() {
        let parent = Transform::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(0.0, 1.0, 1.0));
        let local = parent.make_local(&Transform::from_position(Vec3::ONE));

        assert!(local.position.is_finite());
        assert!(local.scale.is_finite());
        assert_eq!(local.position.x, 0.0);
    }

    #[test]
    fn safe_normalize_falls_back() {
        assert_eq!(safe_normalize(Vec3::ZERO, Vec3::X), Vec3::X);
        assert_eq!(safe_normalize(Vec3::new(0.0, 3.0, 0.0), Vec3::X), Vec3::Y);
    }

    #[test]
    fn look_at_degenerate_target_keeps_rotation() {
        let mut t = Transform::from_position(Vec3::ONE);
        t.rotation = Quat::from_rotation_z(0.5);
        t.look_at(Vec3::ONE, Vec3::Z, Vec3::X, Vec3::Z);

        assert_eq!(t.rotation, Quat::from_rotation_z(0.5));
    }

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let mut t = Transform::IDENTITY;
        t.look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::Z, Vec3::X, Vec3::Z);

        assert!(vec3_approx(t.rotation * Vec3::X, Vec3::Y));
    }
}
