// This module implements the identity-keyed memoization cache at the heart of
// cycle handling. The cache maps (source object identity, target type) to a
// shared forward reference. get_or_create inserts an unresolved cell on first
// encounter and returns the existing cell unchanged on every later encounter,
// which is how an in-progress construction becomes discoverable by a
// re-entrant call before it completes. Each entry pins the source node alive
// so a pointer-derived identity can never be recycled while the cache exists.
// Entries are never evicted for the lifetime of the cache: repeated top-level
// mappings of the same object must return the identical target instance.

//! Identity-keyed memoization of in-flight and completed transformations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::access::handle::{ObjectId, ObjectRef};
use crate::access::schema::TypeToken;
use crate::engine::forward_ref::ForwardRef;

/// Cache key: source identity paired with the requested target type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CacheKey {
    source: ObjectId,
    target: TypeToken,
}

impl CacheKey {
    pub fn new(source: ObjectId, target: TypeToken) -> Self {
        Self { source, target }
    }
}

struct CacheEntry {
    /// Keeps the source allocation alive so its identity cannot be recycled
    /// while this entry exists.
    #[allow(dead_code)]
    source: ObjectRef,
    cell: Rc<ForwardRef>,
}

/// Shared store of forward references for every (source, target type) pair a
/// registry has encountered.
///
/// Entries persist for the lifetime of the cache. This is deliberate
/// memoization, not an oversight: mapping the same element twice through one
/// facade returns the identical target instance. A long-lived facade mapping
/// an unbounded number of distinct sources grows its cache accordingly.
pub struct TransformCache {
    entries: RefCell<HashMap<CacheKey, CacheEntry>>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Return the cell for the key, if one exists (possibly still unresolved).
    pub fn lookup(&self, key: &CacheKey) -> Option<Rc<ForwardRef>> {
        self.entries.borrow().get(key).map(|e| e.cell.clone())
    }

    /// Return the cell for the pair, creating a fresh unresolved cell on first
    /// encounter. The boolean is `true` when the cell was just created.
    pub fn get_or_create(&self, source: &ObjectRef, target: TypeToken) -> (Rc<ForwardRef>, bool) {
        let key = CacheKey::new(source.identity(), target);
        if let Some(entry) = self.entries.borrow().get(&key) {
            log::trace!("cache hit for {:?}", key);
            return (entry.cell.clone(), false);
        }
        log::trace!("cache miss for {:?}, reserving cell", key);
        let cell = Rc::new(ForwardRef::new());
        self.entries.borrow_mut().insert(
            key,
            CacheEntry {
                source: source.clone(),
                cell: cell.clone(),
            },
        );
        (cell, true)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;

    fn token() -> TypeToken {
        TypeToken::of::<String>("String")
    }

    #[test]
    fn test_first_encounter_creates_unresolved_cell() {
        let cache = TransformCache::new();
        let source = ObjectRef::new(Rc::new(StdRefCell::new(1_i64)));

        let (cell, fresh) = cache.get_or_create(&source, token());
        assert!(fresh);
        assert!(!cell.is_resolved());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_revisit_returns_same_cell() {
        let cache = TransformCache::new();
        let source = ObjectRef::new(Rc::new(StdRefCell::new(1_i64)));

        let (first, _) = cache.get_or_create(&source, token());
        let (second, fresh) = cache.get_or_create(&source, token());
        assert!(!fresh);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_objects_get_distinct_entries() {
        let cache = TransformCache::new();
        // Structurally identical, but different allocations.
        let a = ObjectRef::new(Rc::new(StdRefCell::new(1_i64)));
        let b = ObjectRef::new(Rc::new(StdRefCell::new(1_i64)));

        cache.get_or_create(&a, token());
        cache.get_or_create(&b, token());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_distinct_target_types_get_distinct_entries() {
        let cache = TransformCache::new();
        let source = ObjectRef::new(Rc::new(StdRefCell::new(1_i64)));

        cache.get_or_create(&source, TypeToken::of::<String>("String"));
        cache.get_or_create(&source, TypeToken::of::<i64>("i64"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lookup_without_entry() {
        let cache = TransformCache::new();
        let source = ObjectRef::new(Rc::new(StdRefCell::new(1_i64)));
        let key = CacheKey::new(source.identity(), token());
        assert!(cache.lookup(&key).is_none());
    }
}
