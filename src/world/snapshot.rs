use serde::{Deserialize, Serialize};

use crate::errors::{Result, WorldError};
use crate::scene::bounds::BoundingBoxSphere;
use crate::scene::transform::Transform;
use crate::scene::transformation_data::HierarchyKind;
use crate::scene::ObjectHandle;
use crate::world::{ObjectDesc, StableRandomSeed, World};

/// Serializable description of an object and its subtree.
///
/// Holds everything needed to rebuild the subtree losslessly: name, key,
/// local transform, kinematic class, activity, bounds, seed and the ordered
/// children. Handles are not stored; [`World::instantiate`] issues new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_key: Option<String>,
    pub local: Transform,
    pub kind: HierarchyKind,
    pub active: bool,
    pub local_bounds: BoundingBoxSphere,
    pub stable_random_seed: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ObjectSnapshot>,
}

impl World {
    /// Captures an object and its subtree.
    #[must_use]
    pub fn snapshot(&self, handle: ObjectHandle) -> Option<ObjectSnapshot> {
        let object = self.objects.get(handle)?;
        let data = self.store.get(object.data)?;

        Some(ObjectSnapshot {
            name: self.object_name(handle).map(str::to_owned),
            global_key: self.global_key(handle).map(str::to_owned),
            local: data.local,
            kind: object.kind(),
            active: object.active_flag(),
            local_bounds: data.local_bounds,
            stable_random_seed: data.stable_random_seed,
            children: object
                .children
                .iter()
                .filter_map(|&child| self.snapshot(child))
                .collect(),
        })
    }

    /// Captures every root (static roots first, storage order) with its subtree.
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<ObjectSnapshot> {
        HierarchyKind::ALL
            .iter()
            .filter_map(|&kind| self.store.hierarchy(kind).level(0))
            .flat_map(|roots| roots.iter())
            .filter_map(|root| self.snapshot(root.object))
            .collect()
    }

    /// Recreates a snapshot under `parent` (or as a root). Returns the new
    /// handle of the snapshot's root object.
    pub fn instantiate(
        &mut self,
        snapshot: &ObjectSnapshot,
        parent: Option<ObjectHandle>,
    ) -> Result<ObjectHandle> {
        if let Some(parent) = parent
            && !self.objects.contains(parent)
        {
            return Err(WorldError::StaleObjectHandle(parent));
        }

        let desc = ObjectDesc {
            name: snapshot.name.clone(),
            global_key: snapshot.global_key.clone(),
            parent,
            local: snapshot.local,
            dynamic: snapshot.kind.is_dynamic(),
            active: snapshot.active,
            local_bounds: snapshot.local_bounds,
            stable_random_seed: StableRandomSeed::Fixed(snapshot.stable_random_seed),
        };
        let handle = self.create_object(&desc)?;

        for child in &snapshot.children {
            self.instantiate(child, Some(handle))?;
        }
        Ok(handle)
    }
}
