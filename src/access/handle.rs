//! Identity handles over shared object-graph nodes.
//!
//! The engine keys its memoization cache by *reference identity* of the source
//! instance, not by structural equality. [`ObjectRef`] wraps a shared
//! `Rc<RefCell<T>>` node behind `dyn Any` and derives a stable [`ObjectId`]
//! from the `Rc` allocation pointer. [`ObjectHandle`] pairs a node with the
//! [`TypeSchema`] describing it; binding verifies the runtime type so later
//! property access cannot be misdirected.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::access::schema::TypeSchema;
use crate::access::value::Value;
use crate::error::AccessError;

/// Stable identity of a graph node, derived from its allocation.
///
/// Two ids are equal exactly when they refer to the same allocation. An id is
/// only meaningful while something keeps the allocation alive; the transform
/// cache pins the source of every entry for that reason.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}

/// An untyped reference to a shared object-graph node.
#[derive(Clone)]
pub struct ObjectRef {
    cell: Rc<dyn Any>,
}

impl ObjectRef {
    /// Wrap a shared node. The node stays usable by the caller; the engine
    /// only borrows it transiently during property access.
    pub fn new<T: Any>(node: Rc<RefCell<T>>) -> Self {
        Self { cell: node }
    }

    pub fn identity(&self) -> ObjectId {
        ObjectId(Rc::as_ptr(&self.cell) as *const () as usize)
    }

    /// Runtime type of the wrapped cell, used to verify schema bindings.
    pub(crate) fn cell_type(&self) -> TypeId {
        <dyn Any>::type_id(&*self.cell)
    }

    /// Recover the typed node, if the type matches.
    pub fn downcast<T: Any>(&self) -> Option<Rc<RefCell<T>>> {
        self.cell.clone().downcast::<RefCell<T>>().ok()
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        &*self.cell
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:?})", self.identity())
    }
}

/// A graph node paired with the schema that describes its type.
#[derive(Clone)]
pub struct ObjectHandle {
    node: ObjectRef,
    schema: Rc<TypeSchema>,
}

impl ObjectHandle {
    /// Wrap a typed node under the given schema.
    pub fn new<T: Any>(node: Rc<RefCell<T>>, schema: &Rc<TypeSchema>) -> Result<Self, AccessError> {
        Self::bind(ObjectRef::new(node), schema.clone())
    }

    /// Pair an untyped node with a schema, verifying the runtime type.
    pub fn bind(node: ObjectRef, schema: Rc<TypeSchema>) -> Result<Self, AccessError> {
        if node.cell_type() != schema.cell_type() {
            return Err(AccessError::TypeMismatch {
                expected: schema.type_name(),
            });
        }
        Ok(Self { node, schema })
    }

    pub fn identity(&self) -> ObjectId {
        self.node.identity()
    }

    pub fn schema(&self) -> &Rc<TypeSchema> {
        &self.schema
    }

    pub fn node(&self) -> &ObjectRef {
        &self.node
    }

    pub fn downcast<T: Any>(&self) -> Option<Rc<RefCell<T>>> {
        self.node.downcast::<T>()
    }

    /// Read the named property through the schema.
    pub fn get(&self, property: &str) -> Result<Value, AccessError> {
        self.schema.get(self.node.as_any(), property)
    }

    /// Write the named property through the schema.
    pub fn set(&self, property: &str, value: Value) -> Result<(), AccessError> {
        self.schema.set(self.node.as_any(), property, value)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectHandle({}, {:?})",
            self.schema.type_name(),
            self.identity()
        )
    }
}
