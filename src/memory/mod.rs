//! Memory Management
//!
//! - [`Block`] / [`BlockAllocator`]: fixed-size contiguous blocks of POD
//!   records, allocated and freed only as whole blocks
//! - [`FrameAllocator`]: bump arena for tick-scoped scratch data

pub mod block;
pub mod block_allocator;
pub mod frame_allocator;

pub use block::{BLOCK_SIZE_IN_BYTES, Block, block_capacity_for};
pub use block_allocator::{BlockAllocator, BlockAllocatorStats};
pub use frame_allocator::FrameAllocator;
