//! World
//!
//! The [`World`] is the single context object that owns every object,
//! component, transform record, queued message and the clock. There are no
//! globals: several worlds can coexist, and handles are only meaningful in the
//! world that issued them.
//!
//! # Update tick
//!
//! [`World::update`] runs one tick:
//! 1. advance the clock and the update counter
//! 2. deliver next-frame messages and delayed messages that are due
//! 3. flush pending deletions (the only `PendingDeletion -> Removed` transition)
//! 4. propagate the dynamic hierarchy, level by level
//! 5. release tick-scoped scratch memory
//!
//! # Access discipline
//!
//! Structural mutation takes `&mut World`; queries and message posting take
//! `&World`. Across threads, wrap the world in a [`SharedWorld`]
//! (`Arc<RwLock<World>>`): a read lock is the read marker, a write lock the
//! write marker.
//!
//! ```rust,ignore
//! let mut world = World::new(WorldSettings::default())?;
//! let root = world.create_object(&ObjectDesc::new().dynamic())?;
//! let child = world.create_object(
//!     &ObjectDesc::new().with_parent(root).with_position(Vec3::X),
//! )?;
//!
//! world.set_local_position(root, Vec3::new(5.0, 0.0, 0.0));
//! world.update();
//! assert_eq!(world.global_position(child), Some(Vec3::new(6.0, 0.0, 0.0)));
//! ```

mod components;
mod hierarchy_ops;
mod messaging;
mod objects;
mod snapshot;
mod transforms;

pub use snapshot::ObjectSnapshot;

use std::sync::Arc;

use parking_lot::RwLock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::Result;
use crate::memory::{BlockAllocatorStats, FrameAllocator};
use crate::messaging::mailbox::{DeletionRequest, QueuedMessage};
use crate::messaging::{Mailbox, QueueKind};
use crate::scene::component::ComponentEntry;
use crate::scene::hierarchy::HierarchyStats;
use crate::scene::transform_system::{self, PropagationOptions};
use crate::scene::traversal::{self, TraversalMethod, VisitorExecution};
use crate::scene::{
    BoundingBoxSphere, ComponentHandle, CoordinateSystem, HierarchyKind, HierarchyStore, Object,
    ObjectHandle, ObjectStorage, Transform,
};
use crate::settings::WorldSettings;
use crate::tasks::TaskSystem;
use crate::utils::{Clock, NameInterner, Symbol};

/// A world shared between threads. Read lock = read marker, write lock =
/// write marker.
pub type SharedWorld = Arc<RwLock<World>>;

// ============================================================================
// Descriptors
// ============================================================================

/// How an object's stable random seed is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StableRandomSeed {
    /// Drawn from the world's seed generator.
    #[default]
    Random,
    /// Derived deterministically from the parent's seed and the number of
    /// children the parent already has. Falls back to `Random` for roots.
    DeriveFromParent,
    /// Explicit value. `0` and `u32::MAX` are reserved and replaced by `Random`.
    Fixed(u32),
}

/// Everything needed to create an object.
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    pub name: Option<String>,
    pub global_key: Option<String>,
    pub parent: Option<ObjectHandle>,
    pub local: Transform,
    /// Requested kinematic class. A dynamic parent makes the object dynamic
    /// regardless.
    pub dynamic: bool,
    pub active: bool,
    pub local_bounds: BoundingBoxSphere,
    pub stable_random_seed: StableRandomSeed,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            name: None,
            global_key: None,
            parent: None,
            local: Transform::IDENTITY,
            dynamic: false,
            active: true,
            local_bounds: BoundingBoxSphere::INVALID,
            stable_random_seed: StableRandomSeed::Random,
        }
    }
}

impl ObjectDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_global_key(mut self, key: impl Into<String>) -> Self {
        self.global_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ObjectHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_local(mut self, local: Transform) -> Self {
        self.local = local;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: glam::Vec3) -> Self {
        self.local.position = position;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: glam::Quat) -> Self {
        self.local.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: glam::Vec3) -> Self {
        self.local.scale = scale;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: BoundingBoxSphere) -> Self {
        self.local_bounds = bounds;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: StableRandomSeed) -> Self {
        self.stable_random_seed = seed;
        self
    }

    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// What `set_parent` keeps unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPreservation {
    /// Keep the local transform; the global transform follows the new parent.
    PreserveLocal,
    /// Keep the global transform; the local transform is recomputed.
    PreserveGlobal,
}

/// Snapshot of world counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub objects: usize,
    pub components: usize,
    pub static_hierarchy: HierarchyStats,
    pub dynamic_hierarchy: HierarchyStats,
    pub allocator: BlockAllocatorStats,
    pub next_frame_messages: usize,
    pub delayed_messages: usize,
    pub pending_deletions: usize,
    pub update_counter: u64,
}

// ============================================================================
// World
// ============================================================================

/// Hierarchical object and transform storage.
pub struct World {
    settings: WorldSettings,

    objects: ObjectStorage,
    store: HierarchyStore,
    components: SlotMap<ComponentHandle, ComponentEntry>,

    names: NameInterner,
    global_keys: FxHashMap<Symbol, ObjectHandle>,

    mailbox: Mailbox,
    frame: FrameAllocator,
    clock: Clock,
    tasks: Arc<TaskSystem>,

    coordinate_system: CoordinateSystem,
    update_counter: u64,
    seed_rng: StdRng,

    // Reused between ticks.
    message_batch: Vec<QueuedMessage>,
    deletion_batch: Vec<DeletionRequest>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.settings.name)
            .field("objects", &self.objects.len())
            .field("components", &self.components.len())
            .field("update_counter", &self.update_counter)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Creates a world with its own task system.
    pub fn new(settings: WorldSettings) -> Result<Self> {
        settings.validate()?;
        let tasks = Arc::new(TaskSystem::new(&settings.tasks)?);
        Self::with_task_system(settings, tasks)
    }

    /// Creates a world that schedules propagation on a shared task system.
    pub fn with_task_system(settings: WorldSettings, tasks: Arc<TaskSystem>) -> Result<Self> {
        settings.validate()?;

        log::info!(
            "World '{}' created (max {} objects, {} hierarchy levels)",
            settings.name,
            settings.max_objects,
            settings.max_hierarchy_levels
        );

        Ok(Self {
            objects: ObjectStorage::new(settings.max_objects),
            store: HierarchyStore::new(),
            components: SlotMap::with_key(),
            names: NameInterner::new(),
            global_keys: FxHashMap::default(),
            mailbox: Mailbox::new(),
            frame: FrameAllocator::new(),
            clock: Clock::new(&settings.clock),
            tasks,
            coordinate_system: CoordinateSystem::default(),
            update_counter: 0,
            seed_rng: StdRng::seed_from_u64(u64::from(settings.random_seed)),
            message_batch: Vec::new(),
            deletion_batch: Vec::new(),
            settings,
        })
    }

    /// Moves the world behind a read/write lock for sharing between threads.
    #[must_use]
    pub fn into_shared(self) -> SharedWorld {
        Arc::new(RwLock::new(self))
    }

    // ========================================================================
    // Update Tick
    // ========================================================================

    /// Runs one tick. See the module documentation for the order of steps.
    pub fn update(&mut self) {
        self.clock.update();
        self.update_counter += 1;

        let delivered = self.process_queued_messages();
        let deleted = self.flush_pending_deletions();
        self.update_global_transforms();
        self.frame.reset();

        log::trace!(
            "World '{}' tick {}: {delivered} messages delivered, {deleted} objects deleted",
            self.settings.name,
            self.update_counter
        );
    }

    /// Propagates global transforms through the dynamic hierarchy.
    pub fn update_global_transforms(&mut self) {
        let options = PropagationOptions {
            parallel: self.settings.parallel_propagation,
            min_blocks_for_parallel_level: self.settings.min_blocks_for_parallel_level,
        };
        transform_system::update_global_transforms(
            &mut self.store,
            self.update_counter,
            &self.tasks,
            options,
        );
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Visits every object in the given order. Returns `false` if the visitor
    /// returned [`VisitorExecution::Stop`].
    pub fn traverse<F>(&self, method: TraversalMethod, visit: F) -> bool
    where
        F: FnMut(&Object) -> VisitorExecution,
    {
        match method {
            TraversalMethod::BreadthFirst => {
                traversal::traverse_breadth_first(&self.objects, &self.store, visit)
            }
            TraversalMethod::DepthFirst => {
                traversal::traverse_depth_first(&self.objects, &self.store, visit)
            }
        }
    }

    /// Depth-first over `root` and its descendants.
    pub fn traverse_subtree<F>(&self, root: ObjectHandle, mut visit: F) -> bool
    where
        F: FnMut(&Object) -> VisitorExecution,
    {
        traversal::traverse_subtree(&self.objects, root, &mut visit)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[inline]
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[inline]
    #[must_use]
    pub fn task_system(&self) -> &Arc<TaskSystem> {
        &self.tasks
    }

    #[inline]
    #[must_use]
    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.coordinate_system
    }

    pub fn set_coordinate_system(&mut self, coordinate_system: CoordinateSystem) {
        self.coordinate_system = coordinate_system;
    }

    /// Number of completed [`update`](Self::update) calls.
    #[inline]
    #[must_use]
    pub fn update_counter(&self) -> u64 {
        self.update_counter
    }

    #[inline]
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    #[must_use]
    pub fn objects(&self) -> &ObjectStorage {
        &self.objects
    }

    #[inline]
    #[must_use]
    pub fn hierarchy_store(&self) -> &HierarchyStore {
        &self.store
    }

    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            objects: self.objects.len(),
            components: self.components.len(),
            static_hierarchy: self.store.stats(HierarchyKind::Static),
            dynamic_hierarchy: self.store.stats(HierarchyKind::Dynamic),
            allocator: self.store.allocator_stats(),
            next_frame_messages: self.mailbox.queued_count(QueueKind::NextFrame),
            delayed_messages: self.mailbox.queued_count(QueueKind::Delayed),
            pending_deletions: self.mailbox.pending_deletion_count(),
            update_counter: self.update_counter,
        }
    }

    /// Deletes every object and component and drops all queued messages.
    pub fn clear(&mut self) {
        let dropped = self.mailbox.clear();
        self.objects.clear();
        self.components.clear();
        self.global_keys.clear();
        self.store.clear();
        self.frame.reset();
        log::debug!(
            "World '{}' cleared, {dropped} queued messages dropped",
            self.settings.name
        );
    }
}

impl Drop for World {
    fn drop(&mut self) {
        let dropped = self.mailbox.clear();
        log::info!(
            "World '{}' destroyed ({} objects, {dropped} queued messages dropped)",
            self.settings.name,
            self.objects.len()
        );
    }
}
