use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::scene::ObjectHandle;
use crate::scene::bounds::BoundingBoxSphere;
use crate::scene::transform::{Transform, safe_normalize};
use crate::scene::transform_system::{update_record, update_subtree};
use crate::scene::transformation_data::DataRef;
use crate::world::World;

impl World {
    // ========================================================================
    // Getters
    // ========================================================================

    #[must_use]
    pub fn local_transform(&self, handle: ObjectHandle) -> Option<Transform> {
        self.transformation_data(handle).map(|data| data.local)
    }

    /// Cached global transform. For dynamic objects it reflects the last
    /// propagation (or a direct global write since then).
    #[must_use]
    pub fn global_transform(&self, handle: ObjectHandle) -> Option<Transform> {
        self.transformation_data(handle).map(|data| data.global)
    }

    #[must_use]
    pub fn local_position(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.local_transform(handle).map(|t| t.position)
    }

    #[must_use]
    pub fn local_rotation(&self, handle: ObjectHandle) -> Option<Quat> {
        self.local_transform(handle).map(|t| t.rotation)
    }

    #[must_use]
    pub fn local_scaling(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.local_transform(handle).map(|t| t.scale)
    }

    #[must_use]
    pub fn global_position(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.global_transform(handle).map(|t| t.position)
    }

    #[must_use]
    pub fn global_rotation(&self, handle: ObjectHandle) -> Option<Quat> {
        self.global_transform(handle).map(|t| t.rotation)
    }

    #[must_use]
    pub fn global_scaling(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.global_transform(handle).map(|t| t.scale)
    }

    // ========================================================================
    // Local Setters
    // ========================================================================

    /// Replaces the local transform.
    ///
    /// Dynamic objects pick the change up at the next propagation. Static
    /// objects are not propagated per tick, so their subtree is recomputed
    /// immediately. Returns `false` if the handle is stale.
    pub fn set_local_transform(&mut self, handle: ObjectHandle, local: Transform) -> bool {
        self.modify_local(handle, |t| *t = local)
    }

    pub fn set_local_position(&mut self, handle: ObjectHandle, position: Vec3) -> bool {
        self.modify_local(handle, |t| t.position = position)
    }

    pub fn set_local_rotation(&mut self, handle: ObjectHandle, rotation: Quat) -> bool {
        self.modify_local(handle, |t| t.rotation = rotation)
    }

    pub fn set_local_scaling(&mut self, handle: ObjectHandle, scale: Vec3) -> bool {
        self.modify_local(handle, |t| t.scale = scale)
    }

    // ========================================================================
    // Global Setters
    // ========================================================================

    /// Sets the global transform by deriving the matching local transform from
    /// the parent's current global transform. The parent chain is refreshed
    /// first so pending local changes of ancestors are taken into account.
    /// The object's own global transform is updated immediately; dynamic
    /// descendants follow at the next propagation.
    pub fn set_global_transform(&mut self, handle: ObjectHandle, global: Transform) -> bool {
        let Some(parent_global) = self.parent_global(handle) else {
            return false;
        };
        let local = match parent_global {
            Some(parent) => parent.make_local(&global),
            None => global,
        };

        if !self.set_local_transform(handle, local) {
            return false;
        }
        if let Some(object) = self.objects.get(handle)
            && object.is_dynamic()
        {
            update_record(&mut self.store, object.data, self.update_counter);
        }
        true
    }

    pub fn set_global_position(&mut self, handle: ObjectHandle, position: Vec3) -> bool {
        self.modify_global(handle, |t| t.position = position)
    }

    pub fn set_global_rotation(&mut self, handle: ObjectHandle, rotation: Quat) -> bool {
        self.modify_global(handle, |t| t.rotation = rotation)
    }

    pub fn set_global_scaling(&mut self, handle: ObjectHandle, scale: Vec3) -> bool {
        self.modify_global(handle, |t| t.scale = scale)
    }

    /// Recomputes the global transform of an object and its whole subtree now.
    ///
    /// This is the explicit invalidation path for static objects; it works for
    /// dynamic ones too.
    pub fn update_global_transform(&mut self, handle: ObjectHandle) -> bool {
        if !self.objects.contains(handle) {
            return false;
        }
        update_subtree(&self.objects, &mut self.store, handle, self.update_counter);
        true
    }

    // ========================================================================
    // Derived Quantities
    // ========================================================================

    /// Global linear velocity over the last tick.
    #[must_use]
    pub fn linear_velocity(&self, handle: ObjectHandle) -> Option<Vec3> {
        let data = self.transformation_data(handle)?;
        let delta = data.global.position - data.last_global.position;
        Some(delta * self.clock.inv_delta_seconds())
    }

    /// Global angular velocity (axis scaled by radians per second) over the
    /// last tick.
    #[must_use]
    pub fn angular_velocity(&self, handle: ObjectHandle) -> Option<Vec3> {
        let data = self.transformation_data(handle)?;
        let delta = (data.global.rotation * data.last_global.rotation.inverse()).normalize();
        let (axis, mut angle) = delta.to_axis_angle();
        if angle > std::f32::consts::PI {
            angle -= std::f32::consts::TAU;
        }
        if !axis.is_finite() || angle.abs() < f32::EPSILON {
            return Some(Vec3::ZERO);
        }
        Some(axis * angle * self.clock.inv_delta_seconds())
    }

    /// Global direction of the coordinate system's forward axis.
    #[must_use]
    pub fn global_dir_forwards(&self, handle: ObjectHandle) -> Option<Vec3> {
        let forward = self.coordinate_system.forward;
        self.global_direction(handle, forward)
    }

    #[must_use]
    pub fn global_dir_right(&self, handle: ObjectHandle) -> Option<Vec3> {
        let right = self.coordinate_system.right;
        self.global_direction(handle, right)
    }

    #[must_use]
    pub fn global_dir_up(&self, handle: ObjectHandle) -> Option<Vec3> {
        let up = self.coordinate_system.up;
        self.global_direction(handle, up)
    }

    fn global_direction(&self, handle: ObjectHandle, axis: Vec3) -> Option<Vec3> {
        let global = self.global_transform(handle)?;
        Some(safe_normalize(global.rotation * axis, axis))
    }

    // ========================================================================
    // Bounds
    // ========================================================================

    #[must_use]
    pub fn local_bounds(&self, handle: ObjectHandle) -> Option<BoundingBoxSphere> {
        self.transformation_data(handle).map(|data| data.local_bounds)
    }

    #[must_use]
    pub fn global_bounds(&self, handle: ObjectHandle) -> Option<BoundingBoxSphere> {
        self.transformation_data(handle).map(|data| data.global_bounds)
    }

    /// Sets the local bounds and refreshes the global bounds right away.
    pub fn set_local_bounds(&mut self, handle: ObjectHandle, bounds: BoundingBoxSphere) -> bool {
        let Some(data) = self.data_mut(handle) else {
            return false;
        };
        data.local_bounds = bounds;
        data.global_bounds = bounds.transformed(&data.global);
        true
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn modify_local(&mut self, handle: ObjectHandle, modify: impl FnOnce(&mut Transform)) -> bool {
        let Some(object) = self.objects.get(handle) else {
            return false;
        };
        let (data_ref, is_static) = (object.data, object.is_static());

        let Some(data) = self.store.get_mut(data_ref) else {
            return false;
        };
        modify(&mut data.local);

        if is_static {
            if self.settings.report_error_when_static_object_moves {
                log::error!(
                    "static object {handle:?} ('{}') was moved at runtime; make it dynamic instead",
                    self.object_name(handle).unwrap_or("<unnamed>")
                );
            }
            update_subtree(&self.objects, &mut self.store, handle, self.update_counter);
        }
        true
    }

    fn modify_global(&mut self, handle: ObjectHandle, modify: impl FnOnce(&mut Transform)) -> bool {
        let Some(mut global) = self.global_transform(handle) else {
            return false;
        };
        modify(&mut global);
        self.set_global_transform(handle, global)
    }

    /// Up-to-date global transform of the parent.
    /// `Some(None)` for roots, `None` for stale handles.
    fn parent_global(&mut self, handle: ObjectHandle) -> Option<Option<Transform>> {
        let parent = self.objects.get(handle)?.parent;
        Some(parent.and_then(|parent| {
            self.refresh_global_chain(parent);
            self.global_transform(parent)
        }))
    }

    /// Recomputes the global transform of `handle` and of all its ancestors,
    /// root first, from their current local transforms.
    pub(crate) fn refresh_global_chain(&mut self, handle: ObjectHandle) {
        let mut chain: SmallVec<[DataRef; 16]> = SmallVec::new();
        let mut current = Some(handle);
        while let Some(object) = current.and_then(|h| self.objects.get(h)) {
            chain.push(object.data);
            current = object.parent;
        }
        for &data_ref in chain.iter().rev() {
            update_record(&mut self.store, data_ref, self.update_counter);
        }
    }
}
