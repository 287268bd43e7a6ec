// This module implements the property-access capability that isolates all
// dynamic typing behind one narrow interface. A TypeSchema is a per-type table
// of registered getter/setter closures plus an optional zero-argument
// constructor; it answers the four questions the engine ever asks about a type:
// does a named property exist, read it, write it, and construct a default
// instance. Properties carry required/mutable flags consumed by the validator.
// Schemas are built once through a typed SchemaBuilder and frozen behind Rc;
// the closures bridge from the engine's &dyn Any instances to the concrete
// user type exactly once, so no other part of the crate performs downcasts on
// user data.

//! Per-type property access capability.
//!
//! A [`TypeSchema`] is registered per mapped type and provides named property
//! access and default construction. The engine never inspects user types
//! directly; everything goes through the schema's closures.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::access::handle::ObjectRef;
use crate::access::value::Value;
use crate::error::AccessError;

/// A named runtime type identifier.
///
/// Equality and hashing use only the underlying [`TypeId`]; the name is carried
/// for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    pub fn of<T: Any>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeToken {}

impl std::hash::Hash for TypeToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeToken<{}>", self.name)
    }
}

type Getter = Box<dyn Fn(&dyn Any) -> Result<Value, AccessError>>;
type Setter = Box<dyn Fn(&dyn Any, Value) -> Result<(), AccessError>>;
type Constructor = Box<dyn Fn() -> ObjectRef>;

/// One registered property of a schema.
pub struct PropertyDef {
    name: &'static str,
    required: bool,
    getter: Getter,
    setter: Option<Setter>,
}

impl PropertyDef {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the property must be definitely assigned by the end of
    /// construction.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_mutable(&self) -> bool {
        self.setter.is_some()
    }
}

/// Property table and constructor for one mapped type.
pub struct TypeSchema {
    token: TypeToken,
    cell_type: TypeId,
    type_name: &'static str,
    constructor: Option<Constructor>,
    properties: Vec<PropertyDef>,
}

impl TypeSchema {
    /// Start building a schema for `T` under the given display name.
    pub fn of<T: Any>(name: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder::new(name)
    }

    pub fn token(&self) -> TypeToken {
        self.token
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn cell_type(&self) -> TypeId {
        self.cell_type
    }

    /// Whether a property with the given name is registered.
    pub fn exists(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p.name == property)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> + '_ {
        self.properties.iter()
    }

    pub fn is_constructable(&self) -> bool {
        self.constructor.is_some()
    }

    /// Read the named property from an instance of this type.
    pub fn get(&self, instance: &dyn Any, property: &str) -> Result<Value, AccessError> {
        let def = self.lookup(property)?;
        (def.getter)(instance)
    }

    /// Write the named property on an instance of this type.
    pub fn set(&self, instance: &dyn Any, property: &str, value: Value) -> Result<(), AccessError> {
        let def = self.lookup(property)?;
        match &def.setter {
            Some(setter) => setter(instance, value),
            None => Err(AccessError::Immutable {
                property: property.to_string(),
            }),
        }
    }

    /// Construct a fresh default instance.
    pub(crate) fn construct_ref(&self) -> Result<ObjectRef, AccessError> {
        match &self.constructor {
            Some(constructor) => Ok(constructor()),
            None => Err(AccessError::NotConstructable),
        }
    }

    fn lookup(&self, property: &str) -> Result<&PropertyDef, AccessError> {
        self.properties
            .iter()
            .find(|p| p.name == property)
            .ok_or_else(|| AccessError::MissingProperty {
                property: property.to_string(),
            })
    }
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("type", &self.type_name)
            .field("properties", &self.properties.len())
            .field("constructable", &self.is_constructable())
            .finish()
    }
}

/// Append-only builder for [`TypeSchema`].
pub struct SchemaBuilder<T> {
    token: TypeToken,
    cell_type: TypeId,
    type_name: &'static str,
    constructor: Option<Constructor>,
    properties: Vec<PropertyDef>,
    _marker: PhantomData<T>,
}

impl<T: Any> SchemaBuilder<T> {
    fn new(name: &'static str) -> Self {
        Self {
            token: TypeToken::of::<T>(name),
            cell_type: TypeId::of::<RefCell<T>>(),
            type_name: name,
            constructor: None,
            properties: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Register a zero-argument constructor.
    pub fn constructed_with(mut self, ctor: impl Fn() -> T + 'static) -> Self {
        self.constructor = Some(Box::new(move || {
            ObjectRef::new(Rc::new(RefCell::new(ctor())))
        }));
        self
    }

    /// Register `T::default` as the constructor.
    pub fn constructable(self) -> Self
    where
        T: Default,
    {
        self.constructed_with(T::default)
    }

    /// Register a mutable property.
    pub fn property(
        self,
        name: &'static str,
        get: impl Fn(&T) -> Value + 'static,
        set: impl Fn(&mut T, Value) -> Result<(), AccessError> + 'static,
    ) -> Self {
        self.push(name, false, get, Some(set))
    }

    /// Register a mutable property that must be definitely assigned by the
    /// end of construction.
    pub fn required(
        self,
        name: &'static str,
        get: impl Fn(&T) -> Value + 'static,
        set: impl Fn(&mut T, Value) -> Result<(), AccessError> + 'static,
    ) -> Self {
        self.push(name, true, get, Some(set))
    }

    /// Register a read-only property. Writing through it fails with
    /// [`AccessError::Immutable`].
    pub fn readonly(self, name: &'static str, get: impl Fn(&T) -> Value + 'static) -> Self {
        self.push(
            name,
            false,
            get,
            None::<fn(&mut T, Value) -> Result<(), AccessError>>,
        )
    }

    fn push(
        mut self,
        name: &'static str,
        required: bool,
        get: impl Fn(&T) -> Value + 'static,
        set: Option<impl Fn(&mut T, Value) -> Result<(), AccessError> + 'static>,
    ) -> Self {
        let getter: Getter = Box::new(move |instance| {
            let cell = downcast_cell::<T>(instance)?;
            Ok(get(&cell.borrow()))
        });
        let setter: Option<Setter> = set.map(|set| {
            let setter: Setter = Box::new(move |instance: &dyn Any, value: Value| {
                let cell = downcast_cell::<T>(instance)?;
                set(&mut cell.borrow_mut(), value)
            });
            setter
        });
        self.properties.push(PropertyDef {
            name,
            required,
            getter,
            setter,
        });
        self
    }

    /// Freeze the schema.
    pub fn build(self) -> Rc<TypeSchema> {
        Rc::new(TypeSchema {
            token: self.token,
            cell_type: self.cell_type,
            type_name: self.type_name,
            constructor: self.constructor,
            properties: self.properties,
        })
    }
}

fn downcast_cell<T: Any>(instance: &dyn Any) -> Result<&RefCell<T>, AccessError> {
    instance
        .downcast_ref::<RefCell<T>>()
        .ok_or(AccessError::TypeMismatch {
            expected: std::any::type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::handle::ObjectHandle;

    #[derive(Default)]
    struct Sample {
        id: i64,
        label: String,
    }

    fn sample_schema() -> Rc<TypeSchema> {
        TypeSchema::of::<Sample>("Sample")
            .constructable()
            .property(
                "id",
                |s| Value::of(s.id),
                |s, v| {
                    s.id = v.to_scalar::<i64>()?;
                    Ok(())
                },
            )
            .readonly("label", |s| Value::of(s.label.clone()))
            .build()
    }

    #[test]
    fn test_get_and_set() {
        let schema = sample_schema();
        let node = Rc::new(RefCell::new(Sample {
            id: 1,
            label: "a".into(),
        }));
        let handle = ObjectHandle::new(node.clone(), &schema).unwrap();

        assert_eq!(handle.get("id").unwrap().to_scalar::<i64>().unwrap(), 1);
        handle.set("id", Value::of(9_i64)).unwrap();
        assert_eq!(node.borrow().id, 9);
    }

    #[test]
    fn test_missing_property() {
        let schema = sample_schema();
        let handle = ObjectHandle::new(Rc::new(RefCell::new(Sample::default())), &schema).unwrap();
        assert!(matches!(
            handle.get("nope"),
            Err(AccessError::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_readonly_property_rejects_writes() {
        let schema = sample_schema();
        let handle = ObjectHandle::new(Rc::new(RefCell::new(Sample::default())), &schema).unwrap();
        assert!(matches!(
            handle.set("label", Value::of(String::from("x"))),
            Err(AccessError::Immutable { .. })
        ));
    }

    #[test]
    fn test_construct() {
        let schema = sample_schema();
        let node = schema.construct_ref().unwrap();
        let handle = ObjectHandle::bind(node, schema.clone()).unwrap();
        assert_eq!(handle.get("id").unwrap().to_scalar::<i64>().unwrap(), 0);
    }

    #[test]
    fn test_not_constructable() {
        struct Opaque;
        let schema = TypeSchema::of::<Opaque>("Opaque").build();
        assert!(!schema.is_constructable());
        assert!(matches!(
            schema.construct_ref(),
            Err(AccessError::NotConstructable)
        ));
    }

    #[test]
    fn test_bind_verifies_runtime_type() {
        let schema = sample_schema();
        let wrong = ObjectRef::new(Rc::new(RefCell::new(42_i64)));
        assert!(matches!(
            ObjectHandle::bind(wrong, schema),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_exists() {
        let schema = sample_schema();
        assert!(schema.exists("id"));
        assert!(!schema.exists("missing"));
    }
}
