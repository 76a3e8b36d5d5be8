//! Task Scheduling
//!
//! A small task system over `rayon` thread pools:
//! - short tasks on one pool, long-running and file-access tasks on another
//! - main-thread tasks queued until the main thread drains them
//! - task groups as the unit of joining
//! - scoped tasks for fork/join work that borrows from the caller (used as
//!   the per-level barrier during transform propagation)

pub mod task_system;

pub use task_system::{TaskGroupHandle, TaskPriority, TaskSystem};
