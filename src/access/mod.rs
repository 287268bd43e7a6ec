//! Property access layer.
//!
//! Everything the engine knows about user types lives here: dynamic values,
//! identity handles over shared graph nodes, and the per-type schema that
//! bridges named property access to concrete Rust structs.

pub mod handle;
pub mod schema;
pub mod value;

pub use handle::{ObjectHandle, ObjectId, ObjectRef};
pub use schema::{PropertyDef, SchemaBuilder, TypeSchema, TypeToken};
pub use value::Value;
