use crate::errors::invariant;
use crate::memory::block::Block;

/// Hands out and recycles whole [`Block`]s.
///
/// Individual entries are never allocated here; callers fill and drain blocks
/// themselves and give a block back only once it is empty. Returned blocks keep
/// their reserved storage and are reused by the next [`allocate_block`] call.
///
/// The allocator has no internal synchronization. It is owned by a single
/// hierarchy store and all access goes through that store's `&mut self`.
///
/// [`allocate_block`]: BlockAllocator::allocate_block
#[derive(Debug)]
pub struct BlockAllocator<T> {
    free_blocks: Vec<Block<T>>,
    /// Upper bound on cached free blocks; anything beyond is released.
    max_free_blocks: usize,
    live_blocks: usize,
}

/// Allocator usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockAllocatorStats {
    /// Blocks currently handed out.
    pub live_blocks: usize,
    /// Empty blocks cached for reuse.
    pub free_blocks: usize,
}

impl<T> Default for BlockAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockAllocator<T> {
    const DEFAULT_MAX_FREE_BLOCKS: usize = 16;

    #[must_use]
    pub fn new() -> Self {
        Self::with_max_free_blocks(Self::DEFAULT_MAX_FREE_BLOCKS)
    }

    #[must_use]
    pub fn with_max_free_blocks(max_free_blocks: usize) -> Self {
        Self {
            free_blocks: Vec::new(),
            max_free_blocks,
            live_blocks: 0,
        }
    }

    /// Returns an empty block with the type's full capacity reserved.
    ///
    /// Out-of-memory is fatal and reported before aborting.
    pub fn allocate_block(&mut self) -> Block<T> {
        let block = self.free_blocks.pop().unwrap_or_else(Block::allocate);
        self.live_blocks += 1;
        block
    }

    /// Takes back a block.
    ///
    /// The block must be empty. A non-empty block is a programming error:
    /// debug builds assert, release builds log, drop the entries and recycle
    /// the storage anyway.
    pub fn deallocate_block(&mut self, mut block: Block<T>) {
        invariant!(
            block.is_empty(),
            "deallocating a block that still holds {} entries",
            block.len()
        );
        block.clear();

        self.live_blocks = self.live_blocks.saturating_sub(1);
        if self.free_blocks.len() < self.max_free_blocks {
            self.free_blocks.push(block);
        }
    }

    #[must_use]
    pub fn stats(&self) -> BlockAllocatorStats {
        BlockAllocatorStats {
            live_blocks: self.live_blocks,
            free_blocks: self.free_blocks.len(),
        }
    }
}
