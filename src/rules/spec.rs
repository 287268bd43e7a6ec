// This module defines MappingSpec, the frozen, ordered rule list bound to one
// (source type, target type) pair, and the append-only SpecBuilder that
// assembles it. Builder methods mirror the rule variants: convert and its
// converter/default variations, delegate for nested mappings, add for computed
// target values, and remove/ignore for consumed source properties. Each spec
// gets a unique SpecId from a process-wide counter; delegate rules inside a
// spec share that id as their transformer-reuse context, which is what lets a
// delegated convert in phase 1 find the same transformer again in phase 2.
// Specs are frozen behind Rc on build and never mutated afterwards.

//! Mapping specifications and their builder.

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::access::handle::ObjectHandle;
use crate::access::schema::{TypeSchema, TypeToken};
use crate::access::value::Value;
use crate::engine::registry::ContextToken;
use crate::error::{AccessError, ConverterError, MapError, MapResult};
use crate::mapper::Mapper;
use crate::rules::rule::{AddRule, ConvertRule, Converter, DelegateRule, DropRule, MappingRule};
use crate::validation::{self, ValidationResult};

static NEXT_SPEC_ID: AtomicU64 = AtomicU64::new(0);

/// Identity token of one built specification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SpecId(u64);

impl SpecId {
    fn next() -> Self {
        SpecId(NEXT_SPEC_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A frozen, ordered rule list for one (source type, target type) pair.
///
/// Rules are evaluated and applied in declaration order in both phases.
/// Conflicting writes to the same target property are last-write-wins; there
/// is no duplicate detection.
pub struct MappingSpec {
    id: SpecId,
    source: Rc<TypeSchema>,
    target: Rc<TypeSchema>,
    rules: Vec<MappingRule>,
}

impl MappingSpec {
    /// Start defining a specification for mapping `S` to `T`.
    pub fn define<S: Any, T: Any>(
        source: &Rc<TypeSchema>,
        target: &Rc<TypeSchema>,
    ) -> SpecBuilder<S, T> {
        SpecBuilder {
            id: SpecId::next(),
            source: source.clone(),
            target: target.clone(),
            rules: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> SpecId {
        self.id
    }

    pub fn source_type(&self) -> &Rc<TypeSchema> {
        &self.source
    }

    pub fn target_type(&self) -> &Rc<TypeSchema> {
        &self.target
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Whether this specification can be used for mapping between the given
    /// types.
    pub fn applies_to(&self, source: TypeToken, target: TypeToken) -> bool {
        self.source.token() == source && self.target.token() == target
    }

    /// Validate this specification against its own type pair.
    pub fn validate(&self) -> ValidationResult {
        validation::validate(self, &self.source, &self.target)
    }
}

/// Append-only builder producing a frozen [`MappingSpec`].
pub struct SpecBuilder<S, T> {
    id: SpecId,
    source: Rc<TypeSchema>,
    target: Rc<TypeSchema>,
    rules: Vec<MappingRule>,
    _marker: PhantomData<(S, T)>,
}

// TODO: auto-mapping of properties that share a name between source and
// target.
impl<S: Any, T: Any> SpecBuilder<S, T> {
    /// Move one source property to one target property unchanged.
    pub fn convert(mut self, source: &'static str, target: &'static str) -> Self {
        self.rules.push(MappingRule::Convert(ConvertRule::new(
            source, target, None, None,
        )));
        self
    }

    /// Move one source property through a converter function. A null source
    /// value skips the converter and maps to null.
    pub fn convert_with(
        mut self,
        source: &'static str,
        target: &'static str,
        converter: impl Fn(Value) -> Result<Value, ConverterError> + 'static,
    ) -> Self {
        let converter: Converter = Box::new(converter);
        self.rules.push(MappingRule::Convert(ConvertRule::new(
            source,
            target,
            Some(converter),
            None,
        )));
        self
    }

    /// Like [`convert_with`](Self::convert_with), but a null source value maps
    /// to the supplied default instead of null.
    pub fn convert_or(
        mut self,
        source: &'static str,
        target: &'static str,
        converter: impl Fn(Value) -> Result<Value, ConverterError> + 'static,
        default: impl Fn() -> Value + 'static,
    ) -> Self {
        let converter: Converter = Box::new(converter);
        self.rules.push(MappingRule::Convert(ConvertRule::new(
            source,
            target,
            Some(converter),
            Some(Box::new(default)),
        )));
        self
    }

    /// Map an object-reference property through another mapper. The nested
    /// mapper must know how to map `source_type` to `target_type`.
    pub fn delegate(
        mut self,
        source: &'static str,
        target: &'static str,
        source_type: &Rc<TypeSchema>,
        target_type: &Rc<TypeSchema>,
        nested: &Rc<Mapper>,
    ) -> Self {
        self.rules.push(MappingRule::Delegate(DelegateRule::new(
            source,
            target,
            source_type.clone(),
            target_type.clone(),
            nested.clone(),
            ContextToken::Spec(self.id),
        )));
        self
    }

    /// Set a target property to a value computed from the whole source
    /// object.
    pub fn add(mut self, target: &'static str, value: impl Fn(&S) -> Value + 'static) -> Self {
        let value_fn: Box<dyn Fn(&ObjectHandle) -> MapResult<Value>> = Box::new(move |handle| {
            let node = handle.downcast::<S>().ok_or_else(|| {
                MapError::from_access(
                    handle.schema().type_name(),
                    AccessError::TypeMismatch {
                        expected: std::any::type_name::<S>(),
                    },
                )
            })?;
            let value = value(&node.borrow());
            Ok(value)
        });
        self.rules
            .push(MappingRule::Add(AddRule::new(target, value_fn)));
        self
    }

    /// Consume a source property that has no target counterpart, running the
    /// action on its value.
    pub fn remove(mut self, source: &'static str, action: impl Fn(Value) + 'static) -> Self {
        self.rules
            .push(MappingRule::Drop(DropRule::new(source, Box::new(action))));
        self
    }

    /// Consume a source property without any action. A special case of
    /// [`remove`](Self::remove).
    pub fn ignore(self, source: &'static str) -> Self {
        self.remove(source, |_| {})
    }

    /// Freeze the specification.
    pub fn build(self) -> Rc<MappingSpec> {
        Rc::new(MappingSpec {
            id: self.id,
            source: self.source,
            target: self.target,
            rules: self.rules,
        })
    }
}
