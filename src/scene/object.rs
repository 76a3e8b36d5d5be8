use bitflags::bitflags;
use smallvec::SmallVec;

use crate::scene::transformation_data::{DataRef, HierarchyKind};
use crate::scene::{ComponentHandle, ObjectHandle};
use crate::utils::Symbol;

bitflags! {
    /// Per-object state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u8 {
        /// The object's own active switch.
        const ACTIVE_FLAG      = 1 << 0;
        /// Effective activity: own flag and every ancestor's flag are set.
        const ACTIVE_STATE     = 1 << 1;
        /// Marked by delayed deletion, removed at the next sync point.
        const PENDING_DELETION = 1 << 2;
        /// Dynamic on request, not only because of its parent or components.
        const FORCE_DYNAMIC    = 1 << 3;
    }
}

/// Lifecycle of an object.
///
/// `Live -> PendingDeletion -> Removed`. The last transition only happens in
/// `World::flush_pending_deletions` (or through immediate deletion); a removed
/// object no longer resolves, so only the first two states are observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Live,
    PendingDeletion,
}

/// A world object.
///
/// Holds only identity and hierarchy bookkeeping; the transform lives in the
/// object's [`TransformationData`](crate::scene::TransformationData) record,
/// located through [`data_ref`](Object::data_ref).
///
/// # Hierarchy
///
/// - `parent`: handle of the parent object (`None` for roots)
/// - `children`: ordered child handles
///
/// Both are non-owning; objects are owned by the world's object storage.
#[derive(Debug, Clone)]
pub struct Object {
    pub(crate) handle: ObjectHandle,
    pub(crate) name: Option<Symbol>,
    pub(crate) global_key: Option<Symbol>,

    // === Core Hierarchy ===
    pub(crate) parent: Option<ObjectHandle>,
    pub(crate) children: Vec<ObjectHandle>,

    /// Location of the transform record. Level and kinematic class derive from it.
    pub(crate) data: DataRef,

    pub(crate) flags: ObjectFlags,
    pub(crate) components: SmallVec<[ComponentHandle; 4]>,
}

impl Object {
    pub(crate) fn new(handle: ObjectHandle, parent: Option<ObjectHandle>, data: DataRef) -> Self {
        Self {
            handle,
            name: None,
            global_key: None,
            parent,
            children: Vec::new(),
            data,
            flags: ObjectFlags::ACTIVE_FLAG | ObjectFlags::ACTIVE_STATE,
            components: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    /// Interned name, resolve through `World::object_name`.
    #[inline]
    #[must_use]
    pub fn name_symbol(&self) -> Option<Symbol> {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn global_key_symbol(&self) -> Option<Symbol> {
        self.global_key
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ObjectHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ObjectHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }

    #[inline]
    #[must_use]
    pub fn data_ref(&self) -> DataRef {
        self.data
    }

    /// Depth in the hierarchy; roots are level 0.
    #[inline]
    #[must_use]
    pub fn hierarchy_level(&self) -> u32 {
        self.data.level
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> HierarchyKind {
        self.data.kind
    }

    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.data.kind.is_dynamic()
    }

    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        !self.is_dynamic()
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    /// The object's own active switch.
    #[inline]
    #[must_use]
    pub fn active_flag(&self) -> bool {
        self.flags.contains(ObjectFlags::ACTIVE_FLAG)
    }

    /// Effective activity, taking all ancestors into account.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.flags.contains(ObjectFlags::ACTIVE_STATE)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ObjectState {
        if self.flags.contains(ObjectFlags::PENDING_DELETION) {
            ObjectState::PendingDeletion
        } else {
            ObjectState::Live
        }
    }

    #[inline]
    #[must_use]
    pub fn is_pending_deletion(&self) -> bool {
        self.state() == ObjectState::PendingDeletion
    }
}
