//! 变换系统 (Transform System)
//!
//! Computes global transforms from local transforms, level by level.
//!
//! # Level-order propagation
//!
//! Records are already stored grouped by depth (see [`hierarchy`]), so no
//! batching pass is needed:
//! 1. Level 0 of the dynamic hierarchy: `global = local` (roots, no dependencies)
//! 2. Level 1: `global = parent.global ∘ local`, parents are at level 0
//! 3. ...and so on
//!
//! Within a level every record only reads its parent (one level up, in either
//! hierarchy) and writes itself, so blocks of a level are independent and can
//! be updated in parallel. Levels are separated by a full barrier: a scoped
//! task group that joins before the next level starts.
//!
//! The static hierarchy is not propagated per tick. Static records are updated
//! through [`update_subtree`] whenever they change.
//!
//! [`hierarchy`]: crate::scene::hierarchy

use crate::errors::invariant;
use crate::memory::Block;
use crate::scene::hierarchy::{BlockArray, Hierarchy, HierarchyStore};
use crate::scene::object_storage::ObjectStorage;
use crate::scene::transform::Transform;
use crate::scene::transformation_data::{DataRef, HierarchyKind, TransformationData};
use crate::scene::ObjectHandle;
use crate::tasks::TaskSystem;

/// How the dynamic hierarchy is propagated.
#[derive(Debug, Clone, Copy)]
pub struct PropagationOptions {
    /// Propagate blocks of a level on the task system.
    pub parallel: bool,
    /// Levels with fewer blocks run on the calling thread.
    pub min_blocks_for_parallel_level: usize,
}

/// Read-only view of every record a level may reference as parent.
struct ParentLevels<'a> {
    static_hierarchy: &'a Hierarchy,
    /// Dynamic levels that were already propagated this tick.
    dynamic_levels: &'a [BlockArray],
}

impl ParentLevels<'_> {
    #[inline]
    fn global(&self, parent: DataRef) -> Option<&Transform> {
        let array = match parent.kind {
            HierarchyKind::Static => self.static_hierarchy.level(parent.level),
            HierarchyKind::Dynamic => self.dynamic_levels.get(parent.level as usize),
        };
        array?.get(parent.index).map(|data| &data.global)
    }
}

/// Propagates the whole dynamic hierarchy.
///
/// Deterministic: the result does not depend on whether or how blocks were
/// distributed over workers.
pub fn update_global_transforms(
    store: &mut HierarchyStore,
    update_counter: u64,
    tasks: &TaskSystem,
    options: PropagationOptions,
) {
    let (static_hierarchy, dynamic_hierarchy) = store.split_for_propagation();
    let level_count = dynamic_hierarchy.level_count();
    let levels = dynamic_hierarchy.levels_mut();

    for level in 0..level_count {
        let (done, rest) = levels.split_at_mut(level);
        let Some(current) = rest.first_mut() else {
            break;
        };
        if current.is_empty() {
            continue;
        }

        let parents = ParentLevels {
            static_hierarchy,
            dynamic_levels: done,
        };

        let parallel = options.parallel
            && current.block_count() >= options.min_blocks_for_parallel_level
            && tasks.worker_count() > 1;

        log::trace!(
            "propagating dynamic level {level}: {} records in {} blocks ({})",
            current.len(),
            current.block_count(),
            if parallel { "parallel" } else { "serial" }
        );

        if parallel {
            let parents = &parents;
            tasks.scope(|scope| {
                for block in current.blocks_mut() {
                    scope.spawn(move |_| update_block(block, parents, update_counter));
                }
            });
        } else {
            for block in current.blocks_mut() {
                update_block(block, &parents, update_counter);
            }
        }
    }
}

fn update_block(
    block: &mut Block<TransformationData>,
    parents: &ParentLevels<'_>,
    update_counter: u64,
) {
    for data in block.as_mut_slice() {
        match data.parent {
            None => data.update_global(None, update_counter),
            Some(parent) => {
                let parent_global = parents.global(parent).copied();
                invariant!(
                    parent_global.is_some(),
                    "parent record {parent:?} of {:?} does not exist",
                    data.object
                );
                data.update_global(parent_global.as_ref(), update_counter);
            }
        }
    }
}

/// Recomputes one record from its parent's current global transform.
pub(crate) fn update_record(store: &mut HierarchyStore, data_ref: DataRef, update_counter: u64) {
    let parent_global = store
        .get(data_ref)
        .and_then(|data| data.parent)
        .and_then(|parent| store.get(parent))
        .map(|parent| parent.global);

    if let Some(data) = store.get_mut(data_ref) {
        data.update_global(parent_global.as_ref(), update_counter);
    }
}

/// Recomputes `root` and all of its descendants, parents before children.
///
/// Used for static objects (which are skipped by per-tick propagation) and to
/// refresh a subtree right after it was created, moved or reparented.
///
/// 使用显式栈替代递归调用，避免深层级场景的栈溢出风险。
pub(crate) fn update_subtree(
    objects: &ObjectStorage,
    store: &mut HierarchyStore,
    root: ObjectHandle,
    update_counter: u64,
) {
    let mut stack: Vec<ObjectHandle> = Vec::with_capacity(64);
    stack.push(root);

    while let Some(handle) = stack.pop() {
        let Some(object) = objects.get(handle) else {
            continue;
        };
        update_record(store, object.data, update_counter);
        stack.extend(object.children.iter().rev().copied());
    }
}
