//! # Stratum
//!
//! Hierarchical object and transform storage for real-time engines.
//!
//! - Versioned handles for objects and components that survive reallocation
//! - A parent/child hierarchy with level-order global transform propagation
//! - Separate static and dynamic hierarchies; only the dynamic one is
//!   re-propagated every tick
//! - Transform records packed into fixed-size blocks, grouped by depth
//! - Deferred deletion and queued (next-frame / delayed) message delivery so
//!   that nothing mutates the hierarchy during traversal
//!
//! ```rust,ignore
//! use stratum::{ObjectDesc, World, WorldSettings};
//! use glam::Vec3;
//!
//! let mut world = World::new(WorldSettings::default())?;
//! let ship = world.create_object(&ObjectDesc::new().with_name("Ship").dynamic())?;
//! let turret = world.create_object(
//!     &ObjectDesc::new().with_name("Turret").with_parent(ship).with_position(Vec3::Z),
//! )?;
//!
//! world.set_local_position(ship, Vec3::new(10.0, 0.0, 0.0));
//! world.update();
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod memory;
pub mod messaging;
pub mod scene;
pub mod settings;
pub mod tasks;
pub mod utils;
pub mod world;

pub use errors::{Result, WorldError};
pub use messaging::{Message, MessageContext, MessageTarget, QueueKind};
pub use scene::{
    BoundingBoxSphere, Component, ComponentHandle, CoordinateSystem, HierarchyKind, Object,
    ObjectHandle, ObjectState, Transform, TraversalMethod, VisitorExecution,
};
pub use settings::{ClockSettings, TaskSystemSettings, WorldSettings};
pub use tasks::{TaskGroupHandle, TaskPriority, TaskSystem};
pub use world::{
    ObjectDesc, ObjectSnapshot, SharedWorld, StableRandomSeed, TransformPreservation, World,
    WorldStats,
};
