use std::mem::size_of;

use crate::errors::{WorldError, fatal, invariant};

/// Byte budget of a single block. Chosen to keep one block within a few
/// pages so that iterating a block stays cache and prefetch friendly.
pub const BLOCK_SIZE_IN_BYTES: usize = 16 * 1024;

/// Number of `T` entries that fit into one block (at least one).
#[must_use]
pub const fn block_capacity_for(entry_size: usize) -> usize {
    if entry_size == 0 {
        return BLOCK_SIZE_IN_BYTES;
    }
    let capacity = BLOCK_SIZE_IN_BYTES / entry_size;
    if capacity == 0 { 1 } else { capacity }
}

/// A fixed-capacity, contiguous run of entries.
///
/// The backing storage is reserved once when the block is created and never
/// grows, so entries never move while they live in the block. Entries are only
/// appended at the end and removed by swapping with the last entry.
#[derive(Debug)]
pub struct Block<T> {
    entries: Vec<T>,
}

impl<T> Block<T> {
    /// Entries per block for this entry type.
    pub const CAPACITY: usize = block_capacity_for(size_of::<T>());

    /// Allocates an empty block with [`Self::CAPACITY`] reserved entries.
    ///
    /// Running out of memory here is fatal.
    pub(crate) fn allocate() -> Self {
        let mut entries = Vec::new();
        if entries.try_reserve_exact(Self::CAPACITY).is_err() {
            fatal(WorldError::AllocationFailure(format!(
                "could not reserve a block of {} entries ({} bytes)",
                Self::CAPACITY,
                Self::CAPACITY * size_of::<T>()
            )));
        }
        Self { entries }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= Self::CAPACITY
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        Self::CAPACITY
    }

    /// Appends an entry and returns its slot inside the block.
    pub(crate) fn push(&mut self, value: T) -> usize {
        invariant!(!self.is_full(), "push into a full block of {} entries", Self::CAPACITY);
        let slot = self.entries.len();
        self.entries.push(value);
        slot
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.entries.pop()
    }

    /// Drops every entry. The reserved storage is kept.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.entries.get(slot)
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.entries.get_mut(slot)
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.entries
    }
}
