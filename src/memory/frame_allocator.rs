use bumpalo::Bump;
use parking_lot::Mutex;

/// Tick-scoped scratch arena.
///
/// Short-lived lists built during a tick (subtree collections for deletion,
/// recursive message delivery, relocation) are allocated here and released
/// wholesale by [`reset`](FrameAllocator::reset) at the end of the tick.
///
/// The arena sits behind a mutex only so that the owning world stays `Sync`;
/// every access goes through `&mut self` and never actually locks.
#[derive(Debug, Default)]
pub struct FrameAllocator {
    bump: Mutex<Bump>,
}

impl FrameAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the arena.
    #[inline]
    pub fn bump_mut(&mut self) -> &mut Bump {
        self.bump.get_mut()
    }

    /// Bytes currently allocated from the arena's chunks.
    pub fn allocated_bytes(&mut self) -> usize {
        self.bump.get_mut().allocated_bytes()
    }

    /// Releases every allocation made since the last reset.
    pub fn reset(&mut self) {
        self.bump.get_mut().reset();
    }
}
