//! Dynamic property values.
//!
//! [`Value`] is what flows between property getters, converter functions and
//! property setters. A property is either absent (`Null`), a scalar payload, or
//! a reference to another object in the graph. Values are cheap to clone; the
//! scalar payload is reference counted.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::access::handle::ObjectRef;
use crate::error::AccessError;

/// A dynamically typed property value.
#[derive(Clone)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A scalar payload such as a number or a string.
    Scalar(Rc<dyn Any>),
    /// A reference to another object in the graph.
    Object(ObjectRef),
}

impl Value {
    /// Wrap a scalar payload.
    pub fn of<T: Any>(value: T) -> Self {
        Value::Scalar(Rc::new(value))
    }

    /// Wrap a shared graph node as an object reference.
    pub fn reference<T: Any>(node: Rc<RefCell<T>>) -> Self {
        Value::Object(ObjectRef::new(node))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extract a scalar of the given type, cloning the payload.
    pub fn to_scalar<T: Any + Clone>(&self) -> Result<T, AccessError> {
        match self {
            Value::Scalar(payload) => payload.downcast_ref::<T>().cloned().ok_or_else(|| {
                AccessError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                }
            }),
            _ => Err(AccessError::TypeMismatch {
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// Extract an optional scalar; `Null` becomes `None`.
    pub fn to_scalar_opt<T: Any + Clone>(&self) -> Result<Option<T>, AccessError> {
        match self {
            Value::Null => Ok(None),
            other => other.to_scalar::<T>().map(Some),
        }
    }

    /// Extract an optional object reference as a shared graph node; `Null`
    /// becomes `None`.
    pub fn to_reference<T: Any>(&self) -> Result<Option<Rc<RefCell<T>>>, AccessError> {
        match self {
            Value::Null => Ok(None),
            Value::Object(node) => {
                node.downcast::<T>()
                    .map(Some)
                    .ok_or_else(|| AccessError::TypeMismatch {
                        expected: std::any::type_name::<T>(),
                    })
            }
            Value::Scalar(_) => Err(AccessError::TypeMismatch {
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(node) => Some(node),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Scalar(_) => write!(f, "Scalar(..)"),
            Value::Object(node) => write!(f, "Object({:?})", node.identity()),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::of(value)
            }
        })*
    };
}

impl_value_from!(i32, i64, u32, u64, f64, bool, String);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::of(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        let value = Value::of(42_i64);
        assert_eq!(value.to_scalar::<i64>().unwrap(), 42);
    }

    #[test]
    fn test_scalar_type_mismatch() {
        let value = Value::of(42_i64);
        assert!(matches!(
            value.to_scalar::<String>(),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_scalar_opt() {
        assert_eq!(Value::Null.to_scalar_opt::<i64>().unwrap(), None);
        assert_eq!(Value::of(7_i64).to_scalar_opt::<i64>().unwrap(), Some(7));
    }

    #[test]
    fn test_reference_roundtrip() {
        let node = Rc::new(RefCell::new(String::from("shared")));
        let value = Value::reference(node.clone());
        let restored = value.to_reference::<String>().unwrap().unwrap();
        assert!(Rc::ptr_eq(&node, &restored));
    }

    #[test]
    fn test_null_reference() {
        assert!(Value::Null.to_reference::<String>().unwrap().is_none());
    }

    #[test]
    fn test_from_option() {
        let some: Value = Some(3_i64).into();
        let none: Value = Option::<i64>::None.into();
        assert_eq!(some.to_scalar::<i64>().unwrap(), 3);
        assert!(none.is_null());
    }
}
