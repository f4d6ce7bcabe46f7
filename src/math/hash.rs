//! Hashed string names for shader parameters and vertex attributes

use std::fmt;
use std::hash::Hasher;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// A string reduced to a 64-bit hash.
///
/// Property blocks and vertex declarations key their entries by `StrHash`
/// so lookups never touch the original string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrHash(u64);

impl StrHash {
    /// Hash a name
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(name.as_bytes());
        Self(hasher.finish())
    }

    /// Wrap an already computed hash value
    #[must_use]
    pub const fn from_raw(hash: u64) -> Self {
        Self(hash)
    }

    /// Get the raw hash value
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<&str> for StrHash {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for StrHash {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<String> for StrHash {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl fmt::Debug for StrHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrHash({:#018x})", self.0)
    }
}
