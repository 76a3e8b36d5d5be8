//! Utility Module
//!
//! - [`Clock`]: world time (per-tick delta, accumulated time, speed, pause)
//! - [`interner`]: per-world string interning for object names and keys
//!
//! # String Interning
//!
//! Interned strings (Symbols) compare in O(1) time:
//!
//! ```rust,ignore
//! use stratum::utils::NameInterner;
//!
//! let names = NameInterner::new();
//! let a = names.intern("Wheel");
//! let b = names.intern("Wheel");
//! assert_eq!(a, b);
//! ```

pub mod clock;
pub mod interner;

pub use clock::Clock;
pub use interner::{NameInterner, Symbol};
