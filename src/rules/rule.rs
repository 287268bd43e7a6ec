// This module defines the rule variants that make up a mapping specification.
// MappingRule is a closed enum so the two-phase contract stays exhaustive: every
// variant implements fetch (phase 1, reads the source graph, never touches a
// target) and apply (phase 2, writes the target). Convert moves one property,
// optionally through a converter function with a default for null sources.
// Delegate hands an object-reference property to another mapper and is the only
// variant that recurses; its phase 1 lands in the shared transform cache, which
// is what breaks cycles. Add writes a computed value with no source accessor;
// Drop consumes a source property for its side effect and applies nothing. The
// phase-1 result of every rule is an explicit Fetched value handed back to the
// rule in phase 2, so the frozen rules themselves carry no hidden state.

//! Rule variants and their two-phase contract.

use std::rc::Rc;

use crate::access::handle::ObjectHandle;
use crate::access::schema::TypeSchema;
use crate::access::value::Value;
use crate::engine::forward_ref::ForwardRef;
use crate::engine::registry::ContextToken;
use crate::engine::transformer::Transformer;
use crate::error::{AccessError, ConverterError, MapError, MapResult};
use crate::mapper::Mapper;

/// Converter applied to a non-null source value during phase 1.
pub type Converter = Box<dyn Fn(Value) -> Result<Value, ConverterError>>;

/// Supplier of the target value when the source value is null.
pub type DefaultFn = Box<dyn Fn() -> Value>;

/// The phase-1 intermediate a rule hands to its own phase 2.
pub(crate) enum Fetched {
    /// A value ready to be written.
    Immediate(Value),
    /// A forward reference produced by a delegated conversion, together with
    /// the transformer that must execute it. `None` when the source reference
    /// was null and the cell is already resolved.
    Deferred {
        cell: Rc<ForwardRef>,
        transformer: Option<Rc<Transformer>>,
    },
    /// Nothing to apply; the rule's work happened during fetch.
    Discarded,
}

/// One declarative instruction describing how a piece of the target is
/// produced.
pub enum MappingRule {
    Convert(ConvertRule),
    Delegate(DelegateRule),
    Add(AddRule),
    Drop(DropRule),
}

impl MappingRule {
    /// Phase 1: gather from the source graph. Never touches any target.
    pub(crate) fn fetch(&self, source: &ObjectHandle) -> MapResult<Fetched> {
        match self {
            MappingRule::Convert(rule) => rule.fetch(source),
            MappingRule::Delegate(rule) => rule.fetch(source),
            MappingRule::Add(rule) => rule.fetch(source),
            MappingRule::Drop(rule) => rule.fetch(source),
        }
    }

    /// Phase 2: write into the target.
    pub(crate) fn apply(&self, target: &ObjectHandle, fetched: Fetched) -> MapResult<()> {
        match self {
            MappingRule::Convert(rule) => rule.apply(target, fetched),
            MappingRule::Delegate(rule) => rule.apply(target, fetched),
            MappingRule::Add(rule) => rule.apply(target, fetched),
            MappingRule::Drop(_) => Ok(()),
        }
    }

    /// Whether this rule covers the named target property.
    pub(crate) fn maps_to_property(&self, property: &str) -> bool {
        match self {
            MappingRule::Convert(rule) => rule.target == property,
            MappingRule::Delegate(rule) => rule.target == property,
            MappingRule::Add(rule) => rule.target == property,
            MappingRule::Drop(_) => false,
        }
    }

    /// Whether this rule covers the named source property.
    pub(crate) fn maps_from_property(&self, property: &str) -> bool {
        match self {
            MappingRule::Convert(rule) => rule.source == property,
            MappingRule::Delegate(rule) => rule.source == property,
            MappingRule::Add(_) => false,
            MappingRule::Drop(rule) => rule.source == property,
        }
    }
}

fn mismatched_intermediate() -> MapError {
    MapError::PhaseOrder {
        reason: "rule applied with a mismatched intermediate",
    }
}

/// Write a value through the target schema, folding setter type mismatches
/// into a conversion failure naming both properties.
fn write_target(
    target: &ObjectHandle,
    source_property: &str,
    target_property: &'static str,
    value: Value,
) -> MapResult<()> {
    match target.set(target_property, value) {
        Ok(()) => Ok(()),
        Err(cause @ AccessError::TypeMismatch { .. }) => Err(MapError::Conversion {
            source_property: source_property.to_string(),
            target_property: target_property.to_string(),
            cause: Box::new(cause),
        }),
        Err(other) => Err(MapError::from_access(target.schema().type_name(), other)),
    }
}

/// Moves one source property to one target property, optionally through a
/// converter.
pub struct ConvertRule {
    source: &'static str,
    target: &'static str,
    converter: Option<Converter>,
    default: Option<DefaultFn>,
}

impl ConvertRule {
    pub(crate) fn new(
        source: &'static str,
        target: &'static str,
        converter: Option<Converter>,
        default: Option<DefaultFn>,
    ) -> Self {
        Self {
            source,
            target,
            converter,
            default,
        }
    }

    fn fetch(&self, source: &ObjectHandle) -> MapResult<Fetched> {
        let value = source
            .get(self.source)
            .map_err(|e| MapError::from_access(source.schema().type_name(), e))?;

        let converted = match (&self.converter, value) {
            // Without a converter the value passes through unchanged.
            (None, value) => value,
            (Some(_), Value::Null) => match &self.default {
                Some(default) => default(),
                None => Value::Null,
            },
            (Some(converter), value) => {
                converter(value).map_err(|cause| MapError::Conversion {
                    source_property: self.source.to_string(),
                    target_property: self.target.to_string(),
                    cause,
                })?
            }
        };
        Ok(Fetched::Immediate(converted))
    }

    fn apply(&self, target: &ObjectHandle, fetched: Fetched) -> MapResult<()> {
        match fetched {
            Fetched::Immediate(value) => write_target(target, self.source, self.target, value),
            _ => Err(mismatched_intermediate()),
        }
    }
}

/// Hands an object-reference property to another mapper.
pub struct DelegateRule {
    source: &'static str,
    target: &'static str,
    source_type: Rc<TypeSchema>,
    target_type: Rc<TypeSchema>,
    nested: Rc<Mapper>,
    context: ContextToken,
}

impl DelegateRule {
    pub(crate) fn new(
        source: &'static str,
        target: &'static str,
        source_type: Rc<TypeSchema>,
        target_type: Rc<TypeSchema>,
        nested: Rc<Mapper>,
        context: ContextToken,
    ) -> Self {
        Self {
            source,
            target,
            source_type,
            target_type,
            nested,
            context,
        }
    }

    fn fetch(&self, source: &ObjectHandle) -> MapResult<Fetched> {
        let value = source
            .get(self.source)
            .map_err(|e| MapError::from_access(source.schema().type_name(), e))?;

        match value {
            // A null reference maps to a null reference; nothing to recurse
            // into, so the cell is born resolved.
            Value::Null => Ok(Fetched::Deferred {
                cell: Rc::new(ForwardRef::resolved(Value::Null)),
                transformer: None,
            }),
            Value::Object(node) => {
                let child = ObjectHandle::bind(node, self.source_type.clone())
                    .map_err(|e| MapError::from_access(self.source_type.type_name(), e))?;
                let transformer = self.nested.transformer_for(
                    child.schema().token(),
                    self.target_type.token(),
                    self.context,
                )?;
                let cell = transformer.convert(&child)?;
                Ok(Fetched::Deferred {
                    cell,
                    transformer: Some(transformer),
                })
            }
            Value::Scalar(_) => Err(MapError::Conversion {
                source_property: self.source.to_string(),
                target_property: self.target.to_string(),
                cause: "delegated property must hold an object reference or null".into(),
            }),
        }
    }

    fn apply(&self, target: &ObjectHandle, fetched: Fetched) -> MapResult<()> {
        match fetched {
            Fetched::Deferred { cell, transformer } => {
                if let Some(transformer) = transformer {
                    transformer.execute(&cell)?;
                }
                write_target(target, self.source, self.target, cell.value()?)
            }
            _ => Err(mismatched_intermediate()),
        }
    }
}

/// Writes a computed value to a target property that has no source
/// counterpart.
pub struct AddRule {
    target: &'static str,
    value_fn: Box<dyn Fn(&ObjectHandle) -> MapResult<Value>>,
}

impl AddRule {
    pub(crate) fn new(
        target: &'static str,
        value_fn: Box<dyn Fn(&ObjectHandle) -> MapResult<Value>>,
    ) -> Self {
        Self { target, value_fn }
    }

    fn fetch(&self, source: &ObjectHandle) -> MapResult<Fetched> {
        Ok(Fetched::Immediate((self.value_fn)(source)?))
    }

    fn apply(&self, target: &ObjectHandle, fetched: Fetched) -> MapResult<()> {
        match fetched {
            Fetched::Immediate(value) => write_target(target, self.target, self.target, value),
            _ => Err(mismatched_intermediate()),
        }
    }
}

/// Consumes a source property that has no target counterpart, running an
/// action for its side effect during phase 1.
pub struct DropRule {
    source: &'static str,
    action: Box<dyn Fn(Value)>,
}

impl DropRule {
    pub(crate) fn new(source: &'static str, action: Box<dyn Fn(Value)>) -> Self {
        Self { source, action }
    }

    fn fetch(&self, source: &ObjectHandle) -> MapResult<Fetched> {
        let value = source
            .get(self.source)
            .map_err(|e| MapError::from_access(source.schema().type_name(), e))?;
        (self.action)(value);
        Ok(Fetched::Discarded)
    }
}
