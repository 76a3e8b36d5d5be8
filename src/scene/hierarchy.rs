//! Hierarchy Store
//!
//! Transform records grouped by kinematic class and depth:
//!
//! ```text
//! HierarchyStore
//! ├── Static   ── level 0: [Block][Block]...   level 1: [Block]...   ...
//! └── Dynamic  ── level 0: [Block]...          level 1: [Block]...   ...
//! ```
//!
//! Every level is a [`BlockArray`]: a dense sequence of records split over
//! fixed-capacity blocks where every block but the last one is full. Parents
//! of level `L` always live at level `L - 1`, so propagating levels in order
//! visits every parent before its children.
//!
//! Records move in two situations, both reported through [`Relocation`]:
//! - removal swaps the last record of the level into the vacated slot;
//! - reparenting or a kinematic class change moves a record to another level
//!   or hierarchy.
//!
//! The store does not know about children, so callers must patch the moved
//! record's owner and every child whose `parent` pointed at the old location.

use crate::errors::invariant;
use crate::memory::{Block, BlockAllocator, BlockAllocatorStats};
use crate::scene::ObjectHandle;
use crate::scene::transformation_data::{DataRef, HierarchyKind, TransformationData};

type DataBlock = Block<TransformationData>;

const BLOCK_CAPACITY: usize = DataBlock::CAPACITY;

// ============================================================================
// Block Array
// ============================================================================

/// Records of one level of one hierarchy.
#[derive(Debug, Default)]
pub struct BlockArray {
    blocks: Vec<DataBlock>,
    len: usize,
}

impl BlockArray {
    #[inline]
    fn locate(index: u32) -> (usize, usize) {
        let index = index as usize;
        (index / BLOCK_CAPACITY, index % BLOCK_CAPACITY)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &[DataBlock] {
        &self.blocks
    }

    #[inline]
    pub(crate) fn blocks_mut(&mut self) -> &mut [DataBlock] {
        &mut self.blocks
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&TransformationData> {
        let (block, slot) = Self::locate(index);
        self.blocks.get(block)?.get(slot)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut TransformationData> {
        let (block, slot) = Self::locate(index);
        self.blocks.get_mut(block)?.get_mut(slot)
    }

    /// Records in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &TransformationData> {
        self.blocks.iter().flat_map(|block| block.as_slice().iter())
    }

    /// Appends to the last block, allocating a new one when it is full.
    fn push(
        &mut self,
        data: TransformationData,
        allocator: &mut BlockAllocator<TransformationData>,
    ) -> u32 {
        if self.blocks.last().is_none_or(Block::is_full) {
            self.blocks.push(allocator.allocate_block());
        }
        if let Some(block) = self.blocks.last_mut() {
            block.push(data);
        }
        self.len += 1;
        (self.len - 1) as u32
    }

    /// Removes the record at `index` by moving the last record into its slot.
    ///
    /// Returns the removed record and, if another record was moved, its
    /// previous index. An emptied last block goes back to the allocator.
    fn swap_remove(
        &mut self,
        index: u32,
        allocator: &mut BlockAllocator<TransformationData>,
    ) -> Option<(TransformationData, Option<u32>)> {
        if index as usize >= self.len {
            return None;
        }

        let last_index = (self.len - 1) as u32;
        let last = self.blocks.last_mut().and_then(Block::pop)?;
        self.len -= 1;

        let result = if index == last_index {
            (last, None)
        } else {
            let slot = self.get_mut(index)?;
            let removed = std::mem::replace(slot, last);
            (removed, Some(last_index))
        };

        if self.blocks.last().is_some_and(Block::is_empty)
            && let Some(block) = self.blocks.pop()
        {
            allocator.deallocate_block(block);
        }

        Some(result)
    }

    fn release_blocks(&mut self, allocator: &mut BlockAllocator<TransformationData>) {
        for mut block in self.blocks.drain(..) {
            block.clear();
            allocator.deallocate_block(block);
        }
        self.len = 0;
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

/// One hierarchy: block arrays ordered by level. Levels are created lazily
/// and never removed.
#[derive(Debug, Default)]
pub struct Hierarchy {
    levels: Vec<BlockArray>,
}

impl Hierarchy {
    /// Number of levels created so far (some may be empty).
    #[inline]
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&BlockArray> {
        self.levels.get(level as usize)
    }

    #[inline]
    #[must_use]
    pub fn levels(&self) -> &[BlockArray] {
        &self.levels
    }

    #[inline]
    pub(crate) fn levels_mut(&mut self) -> &mut [BlockArray] {
        &mut self.levels
    }

    /// Total records over all levels.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.levels.iter().map(BlockArray::len).sum()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.levels.iter().map(BlockArray::block_count).sum()
    }

    fn level_mut_or_create(&mut self, level: u32) -> &mut BlockArray {
        let level = level as usize;
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, BlockArray::default);
        }
        &mut self.levels[level]
    }
}

// ============================================================================
// Hierarchy Store
// ============================================================================

/// A record moved from `from` to `to`. `object` owns the moved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub object: ObjectHandle,
    pub from: DataRef,
    pub to: DataRef,
}

/// Result of deleting a record.
#[derive(Debug, Clone, Copy)]
pub struct Removal {
    pub removed: TransformationData,
    /// Set when another record was swapped into the vacated slot.
    pub relocation: Option<Relocation>,
}

/// Per-hierarchy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HierarchyStats {
    pub levels: usize,
    pub records: usize,
    pub blocks: usize,
}

/// Both hierarchies plus the block allocator they draw from.
#[derive(Debug, Default)]
pub struct HierarchyStore {
    static_hierarchy: Hierarchy,
    dynamic_hierarchy: Hierarchy,
    allocator: BlockAllocator<TransformationData>,
}

impl HierarchyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn hierarchy(&self, kind: HierarchyKind) -> &Hierarchy {
        match kind {
            HierarchyKind::Static => &self.static_hierarchy,
            HierarchyKind::Dynamic => &self.dynamic_hierarchy,
        }
    }

    #[inline]
    fn hierarchy_mut(&mut self, kind: HierarchyKind) -> &mut Hierarchy {
        match kind {
            HierarchyKind::Static => &mut self.static_hierarchy,
            HierarchyKind::Dynamic => &mut self.dynamic_hierarchy,
        }
    }

    /// Read access to the static hierarchy alongside write access to the
    /// dynamic one, as needed by per-tick propagation.
    #[inline]
    pub(crate) fn split_for_propagation(&mut self) -> (&Hierarchy, &mut Hierarchy) {
        (&self.static_hierarchy, &mut self.dynamic_hierarchy)
    }

    /// Appends a record at `level` of the chosen hierarchy and returns its
    /// location. The level array is created on first use.
    pub fn create_transformation_data(
        &mut self,
        kind: HierarchyKind,
        level: u32,
        data: TransformationData,
    ) -> DataRef {
        let Self {
            static_hierarchy,
            dynamic_hierarchy,
            allocator,
        } = self;
        let hierarchy = match kind {
            HierarchyKind::Static => static_hierarchy,
            HierarchyKind::Dynamic => dynamic_hierarchy,
        };
        let index = hierarchy.level_mut_or_create(level).push(data, allocator);
        DataRef::new(kind, level, index)
    }

    /// Swap-removes the record at `data_ref`.
    ///
    /// Returns `None` (after reporting an invariant violation) if no record
    /// lives there.
    pub fn delete_transformation_data(&mut self, data_ref: DataRef) -> Option<Removal> {
        let Self {
            static_hierarchy,
            dynamic_hierarchy,
            allocator,
        } = self;
        let hierarchy = match data_ref.kind {
            HierarchyKind::Static => static_hierarchy,
            HierarchyKind::Dynamic => dynamic_hierarchy,
        };

        let result = hierarchy
            .levels
            .get_mut(data_ref.level as usize)
            .and_then(|array| array.swap_remove(data_ref.index, allocator));

        invariant!(result.is_some(), "no transformation data at {data_ref:?}");
        let (removed, moved_from) = result?;

        let relocation = moved_from.and_then(|old_index| {
            let moved = self.get(data_ref)?;
            Some(Relocation {
                object: moved.object,
                from: DataRef::new(data_ref.kind, data_ref.level, old_index),
                to: data_ref,
            })
        });

        Some(Removal {
            removed,
            relocation,
        })
    }

    #[inline]
    #[must_use]
    pub fn get(&self, data_ref: DataRef) -> Option<&TransformationData> {
        self.hierarchy(data_ref.kind)
            .level(data_ref.level)?
            .get(data_ref.index)
    }

    #[inline]
    pub fn get_mut(&mut self, data_ref: DataRef) -> Option<&mut TransformationData> {
        self.hierarchy_mut(data_ref.kind)
            .levels
            .get_mut(data_ref.level as usize)?
            .get_mut(data_ref.index)
    }

    /// Drops every record and returns all blocks to the allocator.
    pub fn clear(&mut self) {
        let Self {
            static_hierarchy,
            dynamic_hierarchy,
            allocator,
        } = self;
        for hierarchy in [static_hierarchy, dynamic_hierarchy] {
            for array in &mut hierarchy.levels {
                array.release_blocks(allocator);
            }
        }
    }

    #[must_use]
    pub fn stats(&self, kind: HierarchyKind) -> HierarchyStats {
        let hierarchy = self.hierarchy(kind);
        HierarchyStats {
            levels: hierarchy.level_count(),
            records: hierarchy.record_count(),
            blocks: hierarchy.block_count(),
        }
    }

    #[must_use]
    pub fn allocator_stats(&self) -> BlockAllocatorStats {
        self.allocator.stats()
    }
}
