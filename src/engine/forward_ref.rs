//! Single-assignment placeholders for targets under construction.

use std::cell::RefCell;
use std::fmt;

use crate::access::value::Value;
use crate::error::{MapError, MapResult};

/// A placeholder that reserves a target's identity before the target is fully
/// constructed.
///
/// A forward reference starts unresolved and is resolved exactly once, by the
/// execution phase that owns it. Once resolved it is immutable. Reading an
/// unresolved reference is a phase-order error.
pub struct ForwardRef {
    slot: RefCell<Option<Value>>,
}

impl ForwardRef {
    /// Create an unresolved reference.
    pub fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    /// Create a reference that is already resolved to the given value.
    pub fn resolved(value: Value) -> Self {
        Self {
            slot: RefCell::new(Some(value)),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Resolve the reference. The caller must hold the only construction
    /// frame for this cell; resolving twice is a bug in the engine.
    pub(crate) fn resolve(&self, value: Value) {
        debug_assert!(
            !self.is_resolved(),
            "a forward reference is resolved exactly once"
        );
        *self.slot.borrow_mut() = Some(value);
    }

    /// Read the resolved value.
    pub fn value(&self) -> MapResult<Value> {
        self.slot.borrow().clone().ok_or(MapError::PhaseOrder {
            reason: "forward reference was read before it was resolved",
        })
    }
}

impl Default for ForwardRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resolved() {
            write!(f, "ForwardRef(resolved)")
        } else {
            write!(f, "ForwardRef(pending)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unresolved() {
        let cell = ForwardRef::new();
        assert!(!cell.is_resolved());
        assert!(matches!(
            cell.value(),
            Err(MapError::PhaseOrder { .. })
        ));
    }

    #[test]
    fn test_resolve_then_read() {
        let cell = ForwardRef::new();
        cell.resolve(Value::of(5_i64));
        assert!(cell.is_resolved());
        assert_eq!(cell.value().unwrap().to_scalar::<i64>().unwrap(), 5);
    }

    #[test]
    fn test_pre_resolved_null() {
        // The null-delegate path hands out cells that are born resolved.
        let cell = ForwardRef::resolved(Value::Null);
        assert!(cell.is_resolved());
        assert!(cell.value().unwrap().is_null());
    }
}
