//! 名称驻留器 (Name Interner)
//!
//! Converts object names and global keys into compact integer symbols so that
//! name lookups compare integers instead of strings.
//!
//! Each [`World`](crate::world::World) owns one interner; symbols are only
//! meaningful inside the world that produced them.

use lasso::{Spur, ThreadedRodeo};

/// Symbol 类型别名
///
/// A compact integer identifier, cheap to compare and hash.
pub type Symbol = Spur;

/// Per-world string interner backed by a thread-safe rodeo.
#[derive(Debug, Default)]
pub struct NameInterner {
    rodeo: ThreadedRodeo,
}

impl NameInterner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning the existing symbol if already present.
    #[inline]
    pub fn intern(&self, s: &str) -> Symbol {
        self.rodeo.get_or_intern(s)
    }

    /// Looks up a string without interning it.
    ///
    /// Returns `None` when the string was never interned, which also means no
    /// object can carry that name.
    #[inline]
    #[must_use]
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.rodeo.get(s)
    }

    /// Resolves a symbol back into its string.
    #[inline]
    #[must_use]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.rodeo.resolve(&sym)
    }

    /// Number of distinct strings interned so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}
