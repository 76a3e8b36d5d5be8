use smallvec::SmallVec;

use crate::errors::{Result, WorldError, invariant};
use crate::scene::hierarchy::HierarchyStore;
use crate::scene::object::ObjectFlags;
use crate::scene::object_storage::ObjectStorage;
use crate::scene::transform::Transform;
use crate::scene::transform_system::update_subtree;
use crate::scene::transformation_data::{HierarchyKind, TransformationData};
use crate::scene::{ComponentHandle, ObjectHandle};
use crate::world::objects::{apply_relocation, collect_subtree};
use crate::world::{TransformPreservation, World};

impl World {
    // ========================================================================
    // Reparenting
    // ========================================================================

    /// Moves `child` (with its subtree) under `parent`, or makes it a root
    /// when `parent` is `None`.
    ///
    /// Every record of the subtree is relocated to its new level. Attaching to
    /// a dynamic parent turns the whole subtree dynamic. Fails without any
    /// change on stale handles, self-parenting, cycles and when the subtree
    /// would exceed the level limit.
    pub fn set_parent(
        &mut self,
        child: ObjectHandle,
        parent: Option<ObjectHandle>,
        preservation: TransformPreservation,
    ) -> Result<()> {
        let child_object = self
            .objects
            .get(child)
            .ok_or(WorldError::StaleObjectHandle(child))?;
        if child_object.parent == parent {
            return Ok(());
        }
        let old_level = child_object.hierarchy_level();

        let (new_level, parent_dynamic) = match parent {
            Some(parent) => {
                if parent == child {
                    return Err(WorldError::SelfParent(child));
                }
                let parent_object = self
                    .objects
                    .get(parent)
                    .ok_or(WorldError::StaleObjectHandle(parent))?;
                if self.is_ancestor_of(child, parent) {
                    return Err(WorldError::HierarchyCycle { child, parent });
                }
                (parent_object.hierarchy_level() + 1, parent_object.is_dynamic())
            }
            None => (0, false),
        };

        let depth_below = self.subtree_depth(child);
        let max = self.settings.max_hierarchy_levels;
        if new_level + depth_below >= max {
            return Err(WorldError::HierarchyTooDeep {
                level: new_level + depth_below,
                max,
            });
        }

        self.refresh_global_chain(child);
        if let Some(parent) = parent {
            self.refresh_global_chain(parent);
        }
        let old_global = self.global_transform(child).unwrap_or(Transform::IDENTITY);

        self.unlink_from_parent(child);
        if let Some(parent) = parent
            && let Some(parent_object) = self.objects.get_mut(parent)
        {
            parent_object.children.push(child);
        }
        if let Some(child_object) = self.objects.get_mut(child) {
            child_object.parent = parent;
        }

        let force_dynamic = parent_dynamic.then_some(HierarchyKind::Dynamic);
        self.relocate_subtree(child, force_dynamic);

        if preservation == TransformPreservation::PreserveGlobal {
            let local = match parent.and_then(|p| self.global_transform(p)) {
                Some(parent_global) => parent_global.make_local(&old_global),
                None => old_global,
            };
            if let Some(data) = self.data_mut(child) {
                data.local = local;
            }
        }

        update_subtree(&self.objects, &mut self.store, child, self.update_counter);
        self.update_active_state(child);

        log::debug!("reparented {child:?} under {parent:?} (level {old_level} -> {new_level})");
        Ok(())
    }

    /// Shorthand for `set_parent(child, Some(parent), preservation)`.
    pub fn add_child(
        &mut self,
        parent: ObjectHandle,
        child: ObjectHandle,
        preservation: TransformPreservation,
    ) -> Result<()> {
        self.set_parent(child, Some(parent), preservation)
    }

    /// Turns `child` into a root. Fails if it is not a child of `parent`.
    pub fn detach_child(
        &mut self,
        parent: ObjectHandle,
        child: ObjectHandle,
        preservation: TransformPreservation,
    ) -> Result<()> {
        let child_object = self
            .objects
            .get(child)
            .ok_or(WorldError::StaleObjectHandle(child))?;
        if child_object.parent != Some(parent) {
            return Err(WorldError::NotAChild { parent, child });
        }
        self.set_parent(child, None, preservation)
    }

    // ========================================================================
    // Kinematic Class
    // ========================================================================

    /// Moves the object and its whole subtree into the dynamic hierarchy.
    ///
    /// The object stays dynamic until [`make_static`](Self::make_static) is
    /// called, even once nothing else requires it.
    pub fn make_dynamic(&mut self, handle: ObjectHandle) -> Result<()> {
        let object = self
            .objects
            .get_mut(handle)
            .ok_or(WorldError::StaleObjectHandle(handle))?;
        object.flags.insert(ObjectFlags::FORCE_DYNAMIC);
        self.ensure_dynamic(handle);
        Ok(())
    }

    /// Moves the object into the static hierarchy. Its children keep their
    /// class. Fails if the parent is dynamic or a component requires the
    /// object to be dynamic.
    pub fn make_static(&mut self, handle: ObjectHandle) -> Result<()> {
        let object = self
            .objects
            .get(handle)
            .ok_or(WorldError::StaleObjectHandle(handle))?;
        if object.is_static() {
            return Ok(());
        }
        if self.requires_dynamic(handle, None, false) {
            return Err(WorldError::DynamicParent(handle));
        }
        if let Some(object) = self.objects.get_mut(handle) {
            object.flags.remove(ObjectFlags::FORCE_DYNAMIC);
        }
        self.move_to_static(handle);
        Ok(())
    }

    /// Whether `ancestor` is `handle` itself or one of its ancestors.    /// Whether `ancestor` is `handle` itself or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: ObjectHandle, handle: ObjectHandle) -> bool {
        let mut current = Some(handle);
        while let Some(object) = current.and_then(|h| self.objects.get(h)) {
            if object.handle == ancestor {
                return true;
            }
            current = object.parent;
        }
        false
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Relocates the subtree into the dynamic hierarchy unless the object
    /// already is dynamic.
    pub(crate) fn ensure_dynamic(&mut self, handle: ObjectHandle) {
        if self.objects.get(handle).is_none_or(|object| object.is_dynamic()) {
            return;
        }
        self.relocate_subtree(handle, Some(HierarchyKind::Dynamic));
        log::debug!("{handle:?} is now dynamic");
    }

    /// Whether the object must stay dynamic: a dynamic parent, a dynamic
    /// component other than `ignore`, or (with `honor_force`) an explicit
    /// request.
    fn requires_dynamic(
        &self,
        handle: ObjectHandle,
        ignore: Option<ComponentHandle>,
        honor_force: bool,
    ) -> bool {
        let Some(object) = self.objects.get(handle) else {
            return false;
        };
        if honor_force && object.flags.contains(ObjectFlags::FORCE_DYNAMIC) {
            return true;
        }
        let parent_dynamic = object
            .parent
            .and_then(|parent| self.objects.get(parent))
            .is_some_and(|parent| parent.is_dynamic());
        parent_dynamic
            || object.components.iter().any(|&component| {
                Some(component) != ignore
                    && self
                        .components
                        .get(component)
                        .is_some_and(|entry| entry.component.is_dynamic())
            })
    }

    /// Makes the object static if nothing keeps it dynamic any more, then
    /// gives its children the same chance.
    pub(crate) fn conditional_make_static(
        &mut self,
        handle: ObjectHandle,
        ignore: Option<ComponentHandle>,
    ) {
        let mut pending: SmallVec<[(ObjectHandle, Option<ComponentHandle>); 16]> = SmallVec::new();
        pending.push((handle, ignore));

        while let Some((current, ignore)) = pending.pop() {
            let Some(object) = self.objects.get(current) else {
                continue;
            };
            if object.is_static() || self.requires_dynamic(current, ignore, true) {
                continue;
            }
            self.move_to_static(current);
            if let Some(object) = self.objects.get(current) {
                pending.extend(object.children.iter().map(|&child| (child, None)));
            }
        }
    }

    /// Moves one record into the static hierarchy and recomputes its subtree.
    fn move_to_static(&mut self, handle: ObjectHandle) {
        let Some(level) = self.objects.get(handle).map(|o| o.hierarchy_level()) else {
            return;
        };
        relocate_record(
            &mut self.objects,
            &mut self.store,
            handle,
            HierarchyKind::Static,
            level,
        );
        update_subtree(&self.objects, &mut self.store, handle, self.update_counter);
        log::debug!("{handle:?} is now static");
    }

    /// Levels below `root` in its deepest branch (0 for a leaf).
    fn subtree_depth(&mut self, root: ObjectHandle) -> u32 {
        let Some(base) = self.objects.get(root).map(|o| o.hierarchy_level()) else {
            return 0;
        };
        let Self { objects, frame, .. } = self;
        collect_subtree(objects, root, frame.bump_mut())
            .iter()
            .filter_map(|&h| objects.get(h))
            .map(|object| object.hierarchy_level() - base)
            .max()
            .unwrap_or(0)
    }

    /// Relocates every record of a subtree to `parent level + 1`, into `kind`
    /// when given, otherwise keeping each object's class.
    fn relocate_subtree(&mut self, root: ObjectHandle, kind: Option<HierarchyKind>) {
        let Self {
            objects,
            store,
            frame,
            ..
        } = self;

        // Parents come first, so each child sees its parent's new location.
        for &handle in &collect_subtree(objects, root, frame.bump_mut()) {
            let Some(object) = objects.get(handle) else {
                continue;
            };
            let level = object
                .parent
                .and_then(|parent| objects.get(parent))
                .map_or(0, |parent| parent.hierarchy_level() + 1);
            let target_kind = kind.unwrap_or(object.kind());
            relocate_record(objects, store, handle, target_kind, level);
        }
    }

    pub(crate) fn data_mut(&mut self, handle: ObjectHandle) -> Option<&mut TransformationData> {
        let data_ref = self.objects.get(handle)?.data;
        self.store.get_mut(data_ref)
    }
}

/// Moves one object's record to `kind` / `level`, patching the owner, the
/// object whose record got swapped into the vacated slot, and the parent
/// reference of every child.
fn relocate_record(
    objects: &mut ObjectStorage,
    store: &mut HierarchyStore,
    handle: ObjectHandle,
    kind: HierarchyKind,
    level: u32,
) {
    let Some(object) = objects.get(handle) else {
        return;
    };
    let old_ref = object.data;
    let parent_ref = object.parent.and_then(|p| objects.get(p)).map(|p| p.data);

    if old_ref.kind == kind && old_ref.level == level {
        if let Some(data) = store.get_mut(old_ref) {
            data.parent = parent_ref;
        }
        return;
    }

    let Some(mut data) = store.get(old_ref).copied() else {
        invariant!(false, "{handle:?} has no record at {old_ref:?}");
        return;
    };
    data.parent = parent_ref;

    let new_ref = store.create_transformation_data(kind, level, data);
    if let Some(object) = objects.get_mut(handle) {
        object.data = new_ref;
    }

    if let Some(removal) = store.delete_transformation_data(old_ref)
        && let Some(relocation) = removal.relocation
    {
        apply_relocation(objects, store, relocation);
    }

    let Some(object) = objects.get(handle) else {
        return;
    };
    let new_ref = object.data;
    for &child in &object.children {
        if let Some(child_data) = objects.get(child).and_then(|c| store.get_mut(c.data)) {
            child_data.parent = Some(new_ref);
        }
    }
}
