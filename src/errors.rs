//! Error Types
//!
//! This module defines the error types used throughout the world core.
//!
//! # Overview
//!
//! The main error type [`WorldError`] covers the recoverable failure modes:
//! - Stale object / component handles (ordinary "not found" control flow)
//! - Hierarchy edits that would break the tree (cycles, self-parenting, depth)
//! - Kinematic class conflicts (static objects under dynamic parents)
//! - Settings that fail to parse or validate
//!
//! Two conditions are not recoverable:
//! - [`WorldError::AllocationFailure`] is raised through [`fatal`], which logs
//!   the error and then panics.
//! - Internal invariant violations go through the `invariant!`
//!   macro: a debug assertion in debug builds, an error log in release builds.
//!
//! # Usage
//!
//! ```rust,ignore
//! use stratum::errors::{WorldError, Result};
//!
//! fn reparent(world: &mut World, child: ObjectHandle, parent: ObjectHandle) -> Result<()> {
//!     world.set_parent(child, Some(parent), TransformPreservation::PreserveGlobal)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::{ComponentHandle, ObjectHandle};

/// The main error type for the world core.
#[derive(Error, Debug)]
pub enum WorldError {
    // ========================================================================
    // Handle Errors
    // ========================================================================
    /// The object handle does not resolve (deleted, or issued by another world).
    #[error("Stale object handle: {0:?}")]
    StaleObjectHandle(ObjectHandle),

    /// The component handle does not resolve.
    #[error("Stale component handle: {0:?}")]
    StaleComponentHandle(ComponentHandle),

    // ========================================================================
    // Hierarchy Errors
    // ========================================================================
    /// The object would end up deeper than the configured maximum.
    #[error("Hierarchy level {level} exceeds the maximum of {max} levels")]
    HierarchyTooDeep {
        /// Level the object would be placed at
        level: u32,
        /// Configured level limit
        max: u32,
    },

    /// An object was asked to become its own parent.
    #[error("Object {0:?} cannot be its own parent")]
    SelfParent(ObjectHandle),

    /// The new parent is a descendant of the child.
    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle {
        /// The object being moved
        child: ObjectHandle,
        /// The requested parent
        parent: ObjectHandle,
    },

    /// The object is not a direct child of the given parent.
    #[error("Object {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The expected parent
        parent: ObjectHandle,
        /// The object that was expected to be its child
        child: ObjectHandle,
    },

    /// The object must stay dynamic (dynamic parent or dynamic component).
    #[error("Object {0:?} cannot be made static while its parent or a component requires it to be dynamic")]
    DynamicParent(ObjectHandle),

    // ========================================================================
    // Fatal / Internal Errors
    // ========================================================================
    /// Memory for blocks, records or handles could not be obtained.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// An internal consistency rule was broken.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings text could not be parsed.
    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),

    /// Settings parsed but contain unusable values.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Alias for `Result<T, WorldError>`.
pub type Result<T> = std::result::Result<T, WorldError>;

/// Reports an unrecoverable error and aborts the current operation.
///
/// Used for allocation failures, which leave no meaningful way to continue.
#[cold]
#[track_caller]
pub fn fatal(error: WorldError) -> ! {
    log::error!("{error}");
    panic!("{error}");
}

/// Checks an internal invariant.
///
/// Debug builds assert; release builds log the violation and continue.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            let error = $crate::errors::WorldError::InvariantViolation(format!($($arg)+));
            log::error!("{error}");
            debug_assert!(false, "{error}");
        }
    };
}

pub(crate) use invariant;
