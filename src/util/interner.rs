//! String interning for recurring task ids
//!
//! Ensures each unique task id string is stored only once in memory.
//! Uses DashMap for lock-free concurrent access.
//!
//! Performance benefits:
//! - Memory: single allocation per unique string
//! - Comparison: pointer equality instead of string comparison (O(1) vs O(n))
//! - Cloning: Arc::clone is O(1), no string copy

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

/// Global string interner (thread-safe, lock-free)
static INTERNER: LazyLock<Interner> = LazyLock::new(Interner::new);

/// Thread-safe string interner using DashMap
pub struct Interner {
    /// Map from string content to interned Arc<str>
    strings: DashMap<Arc<str>, ()>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            strings: DashMap::new(),
        }
    }

    /// Intern a string, returning a shared Arc<str>
    ///
    /// If the string was already interned, returns the existing Arc.
    /// Otherwise, creates a new Arc and stores it.
    pub fn intern(&self, s: &str) -> Arc<str> {
        let key: Arc<str> = Arc::from(s);

        if let Some(existing) = self.strings.get(&key) {
            return Arc::clone(existing.key());
        }

        self.strings.insert(Arc::clone(&key), ());
        key
    }

    /// Intern an already-Arc'd string
    #[inline]
    pub fn intern_arc(&self, s: Arc<str>) -> Arc<str> {
        if let Some(existing) = self.strings.get(&s) {
            return Arc::clone(existing.key());
        }

        self.strings.insert(Arc::clone(&s), ());
        s
    }

    /// Number of interned strings
    #[allow(dead_code)] // Used in tests
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if empty
    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

/// Intern a task id string using the global interner
#[inline]
pub fn intern(s: &str) -> Arc<str> {
    INTERNER.intern(s)
}

/// Intern an already-Arc'd string using the global interner
#[inline]
pub fn intern_arc(s: Arc<str>) -> Arc<str> {
    INTERNER.intern_arc(s)
}
