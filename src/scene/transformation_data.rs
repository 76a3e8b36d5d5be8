use serde::{Deserialize, Serialize};

use crate::scene::ObjectHandle;
use crate::scene::bounds::BoundingBoxSphere;
use crate::scene::transform::Transform;

/// Which of the two hierarchies a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HierarchyKind {
    /// Rarely moved objects. Not re-propagated every tick.
    Static = 0,
    /// Frequently moved objects. Re-propagated every tick.
    Dynamic = 1,
}

impl HierarchyKind {
    pub const ALL: [HierarchyKind; 2] = [HierarchyKind::Static, HierarchyKind::Dynamic];

    #[inline]
    #[must_use]
    pub fn from_dynamic(is_dynamic: bool) -> Self {
        if is_dynamic { Self::Dynamic } else { Self::Static }
    }

    #[inline]
    #[must_use]
    pub fn is_dynamic(self) -> bool {
        self == Self::Dynamic
    }
}

/// Physical location of a [`TransformationData`] record.
///
/// A record is addressed by hierarchy, level and its index inside that
/// level's block array. Locations are not stable: swap-removal and
/// relocation move records, and the hierarchy store reports every move so the
/// owner and the children can be patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataRef {
    pub kind: HierarchyKind,
    pub level: u32,
    pub index: u32,
}

impl DataRef {
    #[must_use]
    pub fn new(kind: HierarchyKind, level: u32, index: u32) -> Self {
        Self { kind, level, index }
    }
}

/// Per-object transform record stored in hierarchy blocks.
///
/// Plain data: copying a record is how it is relocated between levels and
/// hierarchies.
///
/// Invariant after propagation: for a root `global == local`, otherwise
/// `global == parent.global.compose(&local)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformationData {
    /// Owning object.
    pub object: ObjectHandle,
    /// Parent record, `None` for roots.
    pub parent: Option<DataRef>,

    pub local: Transform,
    pub global: Transform,

    /// Global transform as of the previous update, for velocity.
    pub last_global: Transform,
    /// Update counter at which `last_global` was captured.
    pub last_global_update: u64,

    pub local_bounds: BoundingBoxSphere,
    pub global_bounds: BoundingBoxSphere,

    pub stable_random_seed: u32,
}

impl TransformationData {
    #[must_use]
    pub fn new(object: ObjectHandle, parent: Option<DataRef>, local: Transform) -> Self {
        Self {
            object,
            parent,
            local,
            global: local,
            last_global: local,
            last_global_update: 0,
            local_bounds: BoundingBoxSphere::INVALID,
            global_bounds: BoundingBoxSphere::INVALID,
            stable_random_seed: 0,
        }
    }

    /// Recomputes the global transform and bounds from the parent's global
    /// transform (`None` for roots).
    ///
    /// The first call for a given `update_counter` snapshots the previous
    /// global transform so velocities can be derived.
    #[inline]
    pub fn update_global(&mut self, parent_global: Option<&Transform>, update_counter: u64) {
        if self.last_global_update != update_counter {
            self.last_global = self.global;
            self.last_global_update = update_counter;
        }

        self.global = match parent_global {
            Some(parent) => parent.compose(&self.local),
            None => self.local,
        };
        self.global_bounds = self.local_bounds.transformed(&self.global);
    }
}
