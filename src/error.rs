// This module defines the error types for the remap engine using the thiserror
// crate for idiomatic Rust error handling. Errors come in two layers: AccessError
// is produced by the property-access capability (missing property, no setter,
// type mismatch, no constructor), while MapError is the engine-level taxonomy
// surfaced to callers of map(): missing properties and immutable targets with
// their owning type named, conversion failures wrapping the inner converter
// error, phase-order violations (programmer errors, always fatal), and
// unresolved mapping definitions. MapResult<T> is the convenience alias used
// throughout the crate.

//! Error types for the mapping engine.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Error type carried by failing converter functions.
pub type ConverterError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised by the property-access capability layer.
///
/// These carry only the property-local context; the engine wraps them into
/// [`MapError`] together with the owning type name.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("no property '{property}' is registered")]
    MissingProperty { property: String },

    #[error("property '{property}' has no setter")]
    Immutable { property: String },

    #[error("value does not have the expected type {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("no zero-argument constructor is registered")]
    NotConstructable,
}

/// Main error type for mapping operations.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("no property '{property}' was found for type {type_name}")]
    MissingProperty {
        type_name: &'static str,
        property: String,
    },

    #[error("property '{property}' of {type_name} is immutable and therefore could not be set")]
    Immutable {
        type_name: &'static str,
        property: String,
    },

    #[error(
        "property '{source_property}' could not be mapped to property \
         '{target_property}' due to conversion issues"
    )]
    Conversion {
        source_property: String,
        target_property: String,
        #[source]
        cause: ConverterError,
    },

    #[error("phase order violation: {reason}")]
    PhaseOrder { reason: &'static str },

    #[error("there is no mapping specification for mapping {source_type} to {target_type}")]
    UnresolvedDefinition {
        source_type: &'static str,
        target_type: &'static str,
    },

    #[error("type {type_name} cannot be constructed without arguments")]
    NotConstructable { type_name: &'static str },

    #[error("property access failed for type {type_name}")]
    Access {
        type_name: &'static str,
        #[source]
        cause: AccessError,
    },
}

impl MapError {
    /// Lift a capability-layer failure into the engine taxonomy, attaching the
    /// owning type name.
    pub(crate) fn from_access(type_name: &'static str, cause: AccessError) -> Self {
        match cause {
            AccessError::MissingProperty { property } => {
                MapError::MissingProperty { type_name, property }
            }
            AccessError::Immutable { property } => MapError::Immutable { type_name, property },
            AccessError::NotConstructable => MapError::NotConstructable { type_name },
            other => MapError::Access {
                type_name,
                cause: other,
            },
        }
    }
}

/// Result type alias for mapping operations.
pub type MapResult<T> = Result<T, MapError>;
