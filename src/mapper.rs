// This module implements the public facade. A Mapper owns one transformer
// registry (and through it the one shared transform cache) and is constructed
// from a provide-definitions closure. The closure is queried fresh on every
// specification lookup and linearly scanned for the first specification whose
// applies_to matches; the scan is deliberately not memoized. map() resolves a
// transformer for the (source, target) pair under the source object's identity
// as context, runs convert then execute, and hands back the resolved target.

//! The public mapping facade.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::access::handle::ObjectHandle;
use crate::access::schema::{TypeSchema, TypeToken};
use crate::access::value::Value;
use crate::engine::registry::{ContextToken, TransformerRegistry};
use crate::engine::transformer::Transformer;
use crate::error::{AccessError, MapError, MapResult};
use crate::rules::spec::MappingSpec;

/// Maps source objects to target objects according to the specifications its
/// definition provider supplies.
///
/// A mapper owns one registry and therefore one transform cache: every object
/// mapped through it, directly or via delegate rules that lead back to it,
/// shares that cache. Mapping the same source object to the same target type
/// twice returns the identical target instance.
pub struct Mapper {
    registry: TransformerRegistry,
}

impl Mapper {
    /// Create a mapper from a definition provider.
    ///
    /// The provider is queried fresh on every specification lookup; the pool
    /// it returns is scanned linearly and the first specification whose
    /// `applies_to` matches wins.
    pub fn new(provide_definitions: impl Fn() -> Vec<Rc<MappingSpec>> + 'static) -> Rc<Self> {
        Rc::new(Self::from_provider(provide_definitions))
    }

    /// Like [`new`](Self::new), but returns an unwrapped value so callers can
    /// tie the knot with [`Rc::new_cyclic`] when a mapper's definitions
    /// delegate to the mapper itself.
    pub fn from_provider(provide_definitions: impl Fn() -> Vec<Rc<MappingSpec>> + 'static) -> Self {
        let lookup = Box::new(move |source: TypeToken, target: TypeToken| {
            provide_definitions()
                .into_iter()
                .find(|spec| spec.applies_to(source, target))
                .ok_or(MapError::UnresolvedDefinition {
                    source_type: source.name(),
                    target_type: target.name(),
                })
        });
        Self {
            registry: TransformerRegistry::new(lookup),
        }
    }

    /// Transform a source object into an instance of the target type.
    pub fn map(&self, source: &ObjectHandle, target: &Rc<TypeSchema>) -> MapResult<ObjectHandle> {
        log::debug!(
            "mapping {} -> {}",
            source.schema().type_name(),
            target.type_name()
        );
        let transformer = self.registry.provide(
            source.schema().token(),
            target.token(),
            ContextToken::Source(source.identity()),
        )?;
        let cell = transformer.convert(source)?;
        transformer.execute(&cell)?;

        match cell.value()? {
            Value::Object(node) => ObjectHandle::bind(node, target.clone())
                .map_err(|e| MapError::from_access(target.type_name(), e)),
            _ => Err(MapError::PhaseOrder {
                reason: "transformation did not resolve to an object",
            }),
        }
    }

    /// Transform and hand back the typed target node.
    pub fn map_into<T: Any>(
        &self,
        source: &ObjectHandle,
        target: &Rc<TypeSchema>,
    ) -> MapResult<Rc<RefCell<T>>> {
        let handle = self.map(source, target)?;
        handle.downcast::<T>().ok_or_else(|| {
            MapError::from_access(
                target.type_name(),
                AccessError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                },
            )
        })
    }

    /// Provide a transformer from this mapper's registry. Delegate rules use
    /// this to recurse while staying on their owning mapper's cache.
    pub(crate) fn transformer_for(
        &self,
        source: TypeToken,
        target: TypeToken,
        context: ContextToken,
    ) -> MapResult<Rc<Transformer>> {
        self.registry.provide(source, target, context)
    }
}
