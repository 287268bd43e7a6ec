//! remap - declarative object-to-object transformation.
//!
//! remap transforms a source object into a target object according to an
//! ordered, per-property rule set, and stays correct on object graphs that
//! contain cycles: a two-phase convert/apply protocol reserves every target's
//! identity in a forward reference before construction completes, and an
//! identity-keyed cache makes in-flight constructions discoverable by
//! re-entrant calls. Revisited objects map to the identical target instance.
//!
//! # Primary Usage
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use remap::{Mapper, MappingSpec, TypeSchema, Value};
//!
//! #[derive(Default)]
//! struct Person { name: String }
//! #[derive(Default)]
//! struct PersonDto { name: String }
//!
//! let person = TypeSchema::of::<Person>("Person")
//!     .constructable()
//!     .property("name",
//!         |p| Value::of(p.name.clone()),
//!         |p, v| { p.name = v.to_scalar::<String>()?; Ok(()) })
//!     .build();
//! let dto = TypeSchema::of::<PersonDto>("PersonDto")
//!     .constructable()
//!     .property("name",
//!         |p| Value::of(p.name.clone()),
//!         |p, v| { p.name = v.to_scalar::<String>()?; Ok(()) })
//!     .build();
//!
//! let mapper = {
//!     let (person, dto) = (person.clone(), dto.clone());
//!     Mapper::new(move || {
//!         vec![MappingSpec::define::<Person, PersonDto>(&person, &dto)
//!             .convert("name", "name")
//!             .build()]
//!     })
//! };
//!
//! let source = remap::ObjectHandle::new(
//!     Rc::new(RefCell::new(Person { name: "Ada".into() })),
//!     &person,
//! ).unwrap();
//! let result = mapper.map_into::<PersonDto>(&source, &dto).unwrap();
//! assert_eq!(result.borrow().name, "Ada");
//! ```
//!
//! # Architecture
//!
//! - [`access`] - property access capability (values, handles, schemas)
//! - [`rules`] - rule variants and mapping specifications
//! - [`engine`] - forward references, transform cache, transformer, registry
//! - [`mapper`] - the public facade
//! - [`validation`] - completeness validation of specifications
//!
//! The engine is single-threaded: ownership is shared through `Rc`/`RefCell`,
//! recursion uses the call stack, and nothing is synchronized. Wrap a mapper
//! in external synchronization if it must cross threads - it will not do so
//! by itself.

pub mod access;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod rules;
pub mod validation;

// Re-export common types at the crate root.
pub use access::{ObjectHandle, ObjectId, ObjectRef, PropertyDef, SchemaBuilder, TypeSchema, TypeToken, Value};
pub use engine::{CacheKey, ContextToken, ForwardRef, TransformCache, Transformer, TransformerRegistry};
pub use error::{AccessError, ConverterError, MapError, MapResult};
pub use mapper::Mapper;
pub use rules::{MappingRule, MappingSpec, SpecBuilder, SpecId};
pub use validation::{validate, ValidationResult};
