//! Dense interning for fast index lookups.
//!
//! Converts vertex names and resource classes to small integer IDs so that
//! every per-node and per-class table can be a plain `Vec`.

use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Interned ID (dense, assigned in insertion order starting at 0).
pub type InternId = usize;

/// Interner that maps keys to dense integer IDs and back.
#[derive(Debug, Clone)]
pub struct Interner<K> {
    to_int: FxHashMap<K, InternId>,
    from_int: Vec<K>,
}

impl<K: Hash + Eq + Clone> Interner<K> {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_int: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_int: Vec::with_capacity(capacity),
        }
    }

    /// Intern a key, returning its integer ID.
    /// If already interned, returns the existing ID.
    pub fn intern(&mut self, key: &K) -> InternId {
        if let Some(&id) = self.to_int.get(key) {
            return id;
        }
        let id = self.from_int.len();
        self.from_int.push(key.clone());
        self.to_int.insert(key.clone(), id);
        id
    }

    /// Get the integer ID for a key, if it exists.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<InternId>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.to_int.get(key).copied()
    }

    /// Get the key for an ID produced by this interner.
    ///
    /// Panics if `id` is out of range, like slice indexing.
    #[inline]
    pub fn key(&self, id: InternId) -> &K {
        &self.from_int[id]
    }

    /// Iterate over `(id, key)` pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (InternId, &K)> {
        self.from_int.iter().enumerate()
    }

    /// Number of interned keys.
    pub fn len(&self) -> usize {
        self.from_int.len()
    }
}

impl<K: Hash + Eq + Clone> Default for Interner<K> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let mut interner: Interner<String> = Interner::with_capacity(10);

        let id1 = interner.intern(&"mul0".to_string());
        let id2 = interner.intern(&"add1".to_string());
        let id3 = interner.intern(&"mul0".to_string()); // duplicate

        assert_eq!(id1, id3);
        assert_ne!(id1, id2);
        assert_eq!(id1, 0);
        assert_eq!(id2, 1);

        assert_eq!(interner.key(id1), "mul0");
        assert_eq!(interner.get("add1"), Some(id2));
        assert_eq!(interner.get("nonexistent"), None);
        assert_eq!(interner.len(), 2);
    }
}
