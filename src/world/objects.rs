use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use rand::RngExt;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{Result, WorldError, invariant};
use crate::scene::component::ComponentEntry;
use crate::scene::hierarchy::{HierarchyStore, Relocation};
use crate::scene::object::{Object, ObjectFlags};
use crate::scene::object_storage::ObjectStorage;
use crate::scene::transform_system::update_record;
use crate::scene::transformation_data::{HierarchyKind, TransformationData};
use crate::scene::{ComponentHandle, ObjectHandle};
use crate::utils::Symbol;
use crate::world::{ObjectDesc, StableRandomSeed, World};

impl World {
    // ========================================================================
    // Creation & Lookup
    // ========================================================================

    /// Creates an object.
    ///
    /// The object is placed one level below its parent (level 0 for roots)
    /// and is dynamic if requested or if the parent is dynamic. Its global
    /// transform is computed right away from the parent's current global
    /// transform.
    ///
    /// Fails with [`WorldError::StaleObjectHandle`] if the parent does not
    /// resolve and with [`WorldError::HierarchyTooDeep`] if the level limit
    /// would be exceeded.
    pub fn create_object(&mut self, desc: &ObjectDesc) -> Result<ObjectHandle> {
        let (parent_ref, parent_dynamic, level, parent_active) = match desc.parent {
            Some(parent) => {
                let parent_object = self
                    .objects
                    .get(parent)
                    .ok_or(WorldError::StaleObjectHandle(parent))?;
                (
                    Some(parent_object.data),
                    parent_object.is_dynamic(),
                    parent_object.hierarchy_level() + 1,
                    parent_object.is_active(),
                )
            }
            None => (None, false, 0, true),
        };

        let max = self.settings.max_hierarchy_levels;
        if level >= max {
            return Err(WorldError::HierarchyTooDeep { level, max });
        }

        let kind = HierarchyKind::from_dynamic(desc.dynamic || parent_dynamic);
        let seed = self.resolve_random_seed(desc.stable_random_seed, desc.parent);
        let name = desc.name.as_deref().map(|name| self.names.intern(name));

        let Self { objects, store, .. } = self;
        let handle = objects.insert_with_handle(|handle| {
            let mut data = TransformationData::new(handle, parent_ref, desc.local);
            data.local_bounds = desc.local_bounds;
            data.stable_random_seed = seed;
            let data_ref = store.create_transformation_data(kind, level, data);

            let mut object = Object::new(handle, desc.parent, data_ref);
            object.name = name;
            object.flags.set(ObjectFlags::ACTIVE_FLAG, desc.active);
            object.flags.set(ObjectFlags::ACTIVE_STATE, desc.active && parent_active);
            object.flags.set(ObjectFlags::FORCE_DYNAMIC, desc.dynamic);
            object
        });

        if let Some(parent) = desc.parent
            && let Some(parent_object) = self.objects.get_mut(parent)
        {
            parent_object.children.push(handle);
        }

        if let Some(object) = self.objects.get(handle) {
            update_record(&mut self.store, object.data, self.update_counter);
        }

        if let Some(key) = desc.global_key.as_deref() {
            self.set_global_key(handle, key);
        }

        log::trace!("created {kind:?} object {handle:?} at level {level}");
        Ok(handle)
    }

    /// Resolves a handle. Stale handles (deleted objects, even if the slot was
    /// reused since) return `None`.
    #[inline]
    #[must_use]
    pub fn try_get_object(&self, handle: ObjectHandle) -> Option<&Object> {
        self.objects.get(handle)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains(handle)
    }

    /// Record backing an object's transform.
    #[must_use]
    pub fn transformation_data(&self, handle: ObjectHandle) -> Option<&TransformationData> {
        let object = self.objects.get(handle)?;
        self.store.get(object.data)
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Deletes an object and its whole subtree right away.
    ///
    /// With `delete_empty_parents`, ancestors that would be left without
    /// children and have no components are deleted as well. Returns `false` if
    /// the handle is stale.
    ///
    /// Must not be called while a traversal is running; use
    /// [`delete_object_delayed`](Self::delete_object_delayed) there.
    pub fn delete_object_now(&mut self, handle: ObjectHandle, delete_empty_parents: bool) -> bool {
        if !self.objects.contains(handle) {
            return false;
        }

        let mut root = handle;
        if delete_empty_parents {
            while let Some(parent) = self
                .objects
                .get(root)
                .and_then(|object| object.parent)
                .and_then(|parent| self.objects.get(parent))
            {
                if parent.children.len() == 1 && parent.components.is_empty() {
                    root = parent.handle;
                } else {
                    break;
                }
            }
        }

        self.unlink_from_parent(root);

        let Self {
            objects,
            store,
            components,
            global_keys,
            frame,
            ..
        } = self;
        let subtree = collect_subtree(objects, root, frame.bump_mut());

        // Children before parents.
        for &object in subtree.iter().rev() {
            remove_object(objects, store, components, global_keys, object);
        }

        log::debug!("deleted {root:?} and {} descendants", subtree.len() - 1);
        true
    }

    /// Marks an object for deletion at the next sync point.
    ///
    /// The object stays addressable and keeps receiving messages until
    /// [`flush_pending_deletions`](Self::flush_pending_deletions) runs.
    /// Returns `false` if the handle is stale.
    pub fn delete_object_delayed(&mut self, handle: ObjectHandle, delete_empty_parents: bool) -> bool {
        let Some(object) = self.objects.get_mut(handle) else {
            return false;
        };
        object.flags.insert(ObjectFlags::PENDING_DELETION);
        self.mailbox.request_deletion(handle, delete_empty_parents);
        true
    }

    /// Removes every object marked for deletion, including deletions requested
    /// by message handlers. Returns the number of requests that still resolved.
    ///
    /// Objects in `PendingDeletion` only ever leave that state here.
    pub fn flush_pending_deletions(&mut self) -> usize {
        let mut requests = std::mem::take(&mut self.deletion_batch);
        self.mailbox.take_deletion_requests(&mut requests);

        let mut deleted = 0;
        for request in requests.drain(..) {
            // Stale when an earlier request already removed an ancestor.
            if self.delete_object_now(request.object, request.delete_empty_parents) {
                deleted += 1;
            }
        }

        self.deletion_batch = requests;
        deleted
    }

    /// Deletes every object whose handle is in `handles` (stale ones are ignored).
    pub fn delete_objects_now(&mut self, handles: &[ObjectHandle]) -> usize {
        handles
            .iter()
            .filter(|&&handle| self.delete_object_now(handle, false))
            .count()
    }

    // ========================================================================
    // Names & Global Keys
    // ========================================================================

    #[must_use]
    pub fn object_name(&self, handle: ObjectHandle) -> Option<&str> {
        let symbol = self.objects.get(handle)?.name?;
        Some(self.names.resolve(symbol))
    }

    /// Renames an object. An empty name clears it.
    pub fn set_name(&mut self, handle: ObjectHandle, name: &str) -> bool {
        let symbol = (!name.is_empty()).then(|| self.names.intern(name));
        match self.objects.get_mut(handle) {
            Some(object) => {
                object.name = symbol;
                true
            }
            None => false,
        }
    }

    /// Assigns a world-unique key. An empty key removes the current one.
    ///
    /// Returns `false` (and logs an error) if another object already uses the
    /// key, or if the handle is stale.
    pub fn set_global_key(&mut self, handle: ObjectHandle, key: &str) -> bool {
        let Some(object) = self.objects.get(handle) else {
            return false;
        };
        let previous = object.global_key;

        if key.is_empty() {
            if let Some(previous) = previous {
                self.global_keys.remove(&previous);
            }
            if let Some(object) = self.objects.get_mut(handle) {
                object.global_key = None;
            }
            return true;
        }

        let symbol = self.names.intern(key);
        if let Some(&owner) = self.global_keys.get(&symbol)
            && owner != handle
        {
            log::error!("global key '{key}' is already used by {owner:?}");
            return false;
        }

        if let Some(previous) = previous {
            self.global_keys.remove(&previous);
        }
        self.global_keys.insert(symbol, handle);
        if let Some(object) = self.objects.get_mut(handle) {
            object.global_key = Some(symbol);
        }
        true
    }

    #[must_use]
    pub fn global_key(&self, handle: ObjectHandle) -> Option<&str> {
        let symbol = self.objects.get(handle)?.global_key?;
        Some(self.names.resolve(symbol))
    }

    #[must_use]
    pub fn try_get_object_with_global_key(&self, key: &str) -> Option<ObjectHandle> {
        let symbol = self.names.get(key)?;
        self.global_keys.get(&symbol).copied()
    }

    /// Finds a child by name; with `recursive`, searches the whole subtree
    /// (depth-first, in child order).
    #[must_use]
    pub fn find_child_by_name(
        &self,
        handle: ObjectHandle,
        name: &str,
        recursive: bool,
    ) -> Option<ObjectHandle> {
        let symbol = self.names.get(name)?;
        let object = self.objects.get(handle)?;

        if !recursive {
            return object
                .children
                .iter()
                .copied()
                .find(|&child| self.has_name(child, symbol));
        }

        let mut stack: Vec<ObjectHandle> = object.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.has_name(current, symbol) {
                return Some(current);
            }
            if let Some(child) = self.objects.get(current) {
                stack.extend(child.children.iter().rev().copied());
            }
        }
        None
    }

    /// Follows a `/`-separated path of child names, e.g. `"Body/Arm/Hand"`.
    #[must_use]
    pub fn find_child_by_path(&self, handle: ObjectHandle, path: &str) -> Option<ObjectHandle> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(handle, |current, segment| {
                self.find_child_by_name(current, segment, false)
            })
    }

    fn has_name(&self, handle: ObjectHandle, symbol: Symbol) -> bool {
        self.objects
            .get(handle)
            .is_some_and(|object| object.name == Some(symbol))
    }

    // ========================================================================
    // Active State
    // ========================================================================

    /// Sets the object's own active flag and updates the effective active
    /// state of its subtree.
    pub fn set_active(&mut self, handle: ObjectHandle, active: bool) -> bool {
        let Some(object) = self.objects.get_mut(handle) else {
            return false;
        };
        object.flags.set(ObjectFlags::ACTIVE_FLAG, active);
        self.update_active_state(handle);
        true
    }

    /// Recomputes `state = own flag && parent state` for a subtree.
    pub(crate) fn update_active_state(&mut self, root: ObjectHandle) {
        let parent_active = self
            .objects
            .get(root)
            .and_then(|object| object.parent)
            .and_then(|parent| self.objects.get(parent))
            .is_none_or(Object::is_active);

        let mut stack = vec![(root, parent_active)];
        while let Some((handle, parent_active)) = stack.pop() {
            let Some(object) = self.objects.get_mut(handle) else {
                continue;
            };
            let active = parent_active && object.active_flag();
            object.flags.set(ObjectFlags::ACTIVE_STATE, active);
            stack.extend(object.children.iter().map(|&child| (child, active)));
        }
    }

    // ========================================================================
    // Stable Random Seeds
    // ========================================================================

    #[must_use]
    pub fn stable_random_seed(&self, handle: ObjectHandle) -> Option<u32> {
        self.transformation_data(handle).map(|data| data.stable_random_seed)
    }

    fn resolve_random_seed(&mut self, mode: StableRandomSeed, parent: Option<ObjectHandle>) -> u32 {
        match mode {
            StableRandomSeed::Fixed(seed) if is_valid_seed(seed) => seed,
            StableRandomSeed::DeriveFromParent => {
                let derived = parent.and_then(|parent| {
                    let object = self.objects.get(parent)?;
                    let data = self.store.get(object.data)?;
                    Some(derive_seed(data.stable_random_seed, object.children.len() as u32))
                });
                derived.unwrap_or_else(|| self.next_random_seed())
            }
            StableRandomSeed::Random | StableRandomSeed::Fixed(_) => self.next_random_seed(),
        }
    }

    fn next_random_seed(&mut self) -> u32 {
        loop {
            let seed: u32 = self.seed_rng.random();
            if is_valid_seed(seed) {
                return seed;
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Removes `handle` from its parent's child list and clears its parent.
    pub(crate) fn unlink_from_parent(&mut self, handle: ObjectHandle) {
        let Some(parent) = self.objects.get_mut(handle).and_then(|object| object.parent.take()) else {
            return;
        };
        if let Some(parent_object) = self.objects.get_mut(parent) {
            let position = parent_object.children.iter().position(|&c| c == handle);
            invariant!(position.is_some(), "{handle:?} is missing from the children of {parent:?}");
            if let Some(position) = position {
                parent_object.children.remove(position);
            }
        }
    }
}

#[inline]
fn is_valid_seed(seed: u32) -> bool {
    seed != 0 && seed != u32::MAX
}

/// Child seed from the parent's seed and the child's index: LCG steps over
/// `base + salt`, skipping the reserved values.
fn derive_seed(base: u32, salt: u32) -> u32 {
    let mut state = base.wrapping_add(salt);
    loop {
        state = state.wrapping_mul(214_013).wrapping_add(2_531_011);
        if is_valid_seed(state) {
            return state;
        }
    }
}

/// `root` and all of its descendants, every parent before its children.
pub(crate) fn collect_subtree<'b>(
    objects: &ObjectStorage,
    root: ObjectHandle,
    bump: &'b Bump,
) -> BumpVec<'b, ObjectHandle> {
    let mut subtree = BumpVec::new_in(bump);
    subtree.push(root);

    let mut next = 0;
    while next < subtree.len() {
        if let Some(object) = objects.get(subtree[next]) {
            subtree.extend_from_slice(&object.children);
        }
        next += 1;
    }
    subtree
}

/// Removes one object with its components, key and transform record.
///
/// Children are not touched; deleting a subtree removes children first.
fn remove_object(
    objects: &mut ObjectStorage,
    store: &mut HierarchyStore,
    components: &mut SlotMap<ComponentHandle, ComponentEntry>,
    global_keys: &mut FxHashMap<Symbol, ObjectHandle>,
    handle: ObjectHandle,
) {
    let Some(object) = objects.remove(handle) else {
        return;
    };

    for &component in &object.components {
        components.remove(component);
    }
    if let Some(key) = object.global_key {
        global_keys.remove(&key);
    }

    if let Some(removal) = store.delete_transformation_data(object.data)
        && let Some(relocation) = removal.relocation
    {
        apply_relocation(objects, store, relocation);
    }
}

/// Patches every reference to a record that moved: the owner's location and
/// the parent reference of each child.
///
/// Children that were already removed (part of a subtree being deleted) are
/// skipped.
pub(crate) fn apply_relocation(
    objects: &mut ObjectStorage,
    store: &mut HierarchyStore,
    relocation: Relocation,
) {
    let Relocation { object, from, to } = relocation;

    let Some(owner) = objects.get_mut(object) else {
        invariant!(false, "relocated record belongs to missing object {object:?}");
        return;
    };
    invariant!(
        owner.data == from,
        "{object:?} expected its record at {from:?}, found {:?}",
        owner.data
    );
    owner.data = to;

    let Some(owner) = objects.get(object) else {
        return;
    };
    for &child in &owner.children {
        let Some(child_data) = objects.get(child).and_then(|c| store.get_mut(c.data)) else {
            continue;
        };
        invariant!(
            child_data.parent == Some(from),
            "child {child:?} of {object:?} pointed at {:?} instead of {from:?}",
            child_data.parent
        );
        child_data.parent = Some(to);
    }
}
