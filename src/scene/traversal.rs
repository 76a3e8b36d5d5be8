use smallvec::SmallVec;

use crate::scene::hierarchy::HierarchyStore;
use crate::scene::object::Object;
use crate::scene::object_storage::ObjectStorage;
use crate::scene::transformation_data::HierarchyKind;
use crate::scene::ObjectHandle;

/// Visitor verdict for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorExecution {
    /// Keep going.
    Continue,
    /// Do not descend into this object's children (depth-first only;
    /// breadth-first treats it as `Continue`).
    Skip,
    /// Abort the traversal immediately.
    Stop,
}

/// Traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMethod {
    /// Level 0 of both hierarchies, then level 1, and so on; static before
    /// dynamic within a level, storage order within a hierarchy level.
    BreadthFirst,
    /// Each root in storage order (static roots first), the object before its
    /// children, children in their stored order.
    DepthFirst,
}

/// Visits every object breadth-first. Returns `false` if the visitor stopped.
pub fn traverse_breadth_first<F>(objects: &ObjectStorage, store: &HierarchyStore, mut visit: F) -> bool
where
    F: FnMut(&Object) -> VisitorExecution,
{
    let level_count = HierarchyKind::ALL
        .iter()
        .map(|&kind| store.hierarchy(kind).level_count())
        .max()
        .unwrap_or(0);

    for level in 0..level_count as u32 {
        for kind in HierarchyKind::ALL {
            let Some(array) = store.hierarchy(kind).level(level) else {
                continue;
            };
            for data in array.iter() {
                let Some(object) = objects.get(data.object) else {
                    continue;
                };
                if visit(object) == VisitorExecution::Stop {
                    return false;
                }
            }
        }
    }
    true
}

/// Visits every object depth-first. Returns `false` if the visitor stopped.
pub fn traverse_depth_first<F>(objects: &ObjectStorage, store: &HierarchyStore, mut visit: F) -> bool
where
    F: FnMut(&Object) -> VisitorExecution,
{
    for kind in HierarchyKind::ALL {
        let Some(roots) = store.hierarchy(kind).level(0) else {
            continue;
        };
        for root in roots.iter() {
            if !traverse_subtree(objects, root.object, &mut visit) {
                return false;
            }
        }
    }
    true
}

/// Depth-first over `root` and its descendants. Returns `false` if the
/// visitor stopped.
pub fn traverse_subtree<F>(objects: &ObjectStorage, root: ObjectHandle, visit: &mut F) -> bool
where
    F: FnMut(&Object) -> VisitorExecution,
{
    let mut stack: SmallVec<[ObjectHandle; 32]> = SmallVec::new();
    stack.push(root);

    while let Some(handle) = stack.pop() {
        let Some(object) = objects.get(handle) else {
            continue;
        };
        match visit(object) {
            VisitorExecution::Stop => return false,
            VisitorExecution::Skip => {}
            VisitorExecution::Continue => stack.extend(object.children.iter().rev().copied()),
        }
    }
    true
}
