use slotmap::DenseSlotMap;

use crate::errors::{WorldError, fatal};
use crate::scene::ObjectHandle;
use crate::scene::object::Object;

/// Stable-handle registry for objects.
///
/// Backed by a dense slot map: objects sit in one contiguous array, removal
/// swaps the last object into the hole, and handles carry a generation so a
/// handle to a removed object never resolves again, even after its slot is
/// reused.
#[derive(Debug)]
pub struct ObjectStorage {
    objects: DenseSlotMap<ObjectHandle, Object>,
    max_objects: usize,
}

impl ObjectStorage {
    #[must_use]
    pub fn new(max_objects: u32) -> Self {
        Self {
            objects: DenseSlotMap::with_key(),
            max_objects: max_objects as usize,
        }
    }

    /// Inserts an object built from its freshly issued handle.
    ///
    /// Exceeding the configured object limit is fatal.
    pub(crate) fn insert_with_handle(
        &mut self,
        build: impl FnOnce(ObjectHandle) -> Object,
    ) -> ObjectHandle {
        if self.objects.len() >= self.max_objects {
            fatal(WorldError::AllocationFailure(format!(
                "object storage is full ({} objects)",
                self.max_objects
            )));
        }
        self.objects.insert_with_key(build)
    }

    pub(crate) fn remove(&mut self, handle: ObjectHandle) -> Option<Object> {
        self.objects.remove(handle)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: ObjectHandle) -> Option<&Object> {
        self.objects.get(handle)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut Object> {
        self.objects.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(handle)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &Object)> {
        self.objects.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.objects.clear();
    }
}
