//! 场景层级模块 (Scene Hierarchy)
//!
//! Data structures behind the world:
//! - [`Object`]: identity and hierarchy bookkeeping, stored in [`ObjectStorage`]
//! - [`TransformationData`]: per-object transform record, stored in the
//!   [`HierarchyStore`] grouped by kinematic class and depth
//! - [`Transform`]: TRS transform and its composition rules
//! - [`transform_system`]: level-order global transform propagation
//! - [`traversal`]: breadth-first and depth-first visitors
//! - [`Component`]: behaviour attached to objects

pub mod bounds;
pub mod component;
pub mod coordinates;
pub mod hierarchy;
pub mod object;
pub mod object_storage;
pub mod transform;
pub mod transform_system;
pub mod transformation_data;
pub mod traversal;

// 重新导出常用类型
pub use bounds::BoundingBoxSphere;
pub use component::Component;
pub use coordinates::CoordinateSystem;
pub use hierarchy::{BlockArray, Hierarchy, HierarchyStats, HierarchyStore, Relocation};
pub use object::{Object, ObjectFlags, ObjectState};
pub use object_storage::ObjectStorage;
pub use transform::{Transform, safe_normalize};
pub use transformation_data::{DataRef, HierarchyKind, TransformationData};
pub use traversal::{TraversalMethod, VisitorExecution};

use slotmap::new_key_type;

new_key_type! {
    /// Versioned handle to an [`Object`].
    pub struct ObjectHandle;
    /// Versioned handle to a [`Component`].
    pub struct ComponentHandle;
}
