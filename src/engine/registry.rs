// This module implements the transformer registry: the owner of exactly one
// transform cache, shared by every transformer it issues. Transformers are
// reused by context-token identity alone; the token is the source object's
// identity for top-level calls and the owning specification's id for delegate
// rules, so a delegated phase 2 finds the very transformer that ran its phase
// 1 and still holds the intermediates. Specification resolution goes through
// an injected lookup function so the registry stays ignorant of where
// definitions come from. Reuse is a construction-cost optimization only;
// cycle-breaking correctness depends on the shared cache, never on transformer
// reuse.

//! Transformer reuse and cache ownership.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::access::handle::ObjectId;
use crate::access::schema::TypeToken;
use crate::engine::cache::TransformCache;
use crate::engine::transformer::Transformer;
use crate::error::MapResult;
use crate::rules::spec::{MappingSpec, SpecId};

/// Reuse key for issued transformers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ContextToken {
    /// A top-level map call, keyed by the source object.
    Source(ObjectId),
    /// A delegate rule, keyed by the specification that owns it.
    Spec(SpecId),
}

/// Resolves the applicable specification for a type pair.
pub type SpecLookup = Box<dyn Fn(TypeToken, TypeToken) -> MapResult<Rc<MappingSpec>>>;

/// Owns one [`TransformCache`] and hands out [`Transformer`]s, reusing them by
/// context identity.
pub struct TransformerRegistry {
    cache: Rc<TransformCache>,
    transformers: RefCell<HashMap<ContextToken, Rc<Transformer>>>,
    lookup: SpecLookup,
}

impl TransformerRegistry {
    pub fn new(lookup: SpecLookup) -> Self {
        Self {
            cache: Rc::new(TransformCache::new()),
            transformers: RefCell::new(HashMap::new()),
            lookup,
        }
    }

    /// Provide a transformer for the type pair under the given context.
    ///
    /// A transformer already issued for the context is returned as is; the
    /// requested types are not consulted again. Otherwise the applicable
    /// specification is resolved through the injected lookup and a new
    /// transformer is bound to the shared cache.
    pub fn provide(
        &self,
        source: TypeToken,
        target: TypeToken,
        context: ContextToken,
    ) -> MapResult<Rc<Transformer>> {
        if let Some(existing) = self.transformers.borrow().get(&context) {
            log::trace!("reusing transformer for {:?}", context);
            return Ok(existing.clone());
        }

        let spec = (self.lookup)(source, target)?;
        log::debug!(
            "issuing transformer for {:?} -> {:?} under {:?}",
            source,
            target,
            context
        );
        let transformer = Rc::new(Transformer::new(spec, self.cache.clone()));
        self.transformers
            .borrow_mut()
            .insert(context, transformer.clone());
        Ok(transformer)
    }

    /// The cache shared by every transformer this registry issues.
    pub fn cache(&self) -> &Rc<TransformCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::schema::TypeSchema;
    use crate::access::value::Value;
    use crate::error::MapError;
    use crate::rules::spec::MappingSpec;

    #[derive(Default)]
    struct Source {
        id: i64,
    }

    #[derive(Default)]
    struct Target {
        id: i64,
    }

    fn schemas() -> (Rc<TypeSchema>, Rc<TypeSchema>) {
        let source = TypeSchema::of::<Source>("Source")
            .constructable()
            .property(
                "id",
                |s| Value::of(s.id),
                |s, v| {
                    s.id = v.to_scalar::<i64>()?;
                    Ok(())
                },
            )
            .build();
        let target = TypeSchema::of::<Target>("Target")
            .constructable()
            .property(
                "id",
                |s| Value::of(s.id),
                |s, v| {
                    s.id = v.to_scalar::<i64>()?;
                    Ok(())
                },
            )
            .build();
        (source, target)
    }

    fn registry() -> TransformerRegistry {
        let (source, target) = schemas();
        let spec = MappingSpec::define::<Source, Target>(&source, &target)
            .convert("id", "id")
            .build();
        TransformerRegistry::new(Box::new(move |s, t| {
            if spec.applies_to(s, t) {
                Ok(spec.clone())
            } else {
                Err(MapError::UnresolvedDefinition {
                    source_type: s.name(),
                    target_type: t.name(),
                })
            }
        }))
    }

    #[test]
    fn test_same_context_reuses_transformer() {
        let registry = registry();
        let (source, target) = schemas();
        let context = ContextToken::Spec(
            MappingSpec::define::<Source, Target>(&source, &target)
                .build()
                .id(),
        );

        let first = registry
            .provide(source.token(), target.token(), context)
            .unwrap();
        let second = registry
            .provide(source.token(), target.token(), context)
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_distinct_contexts_get_distinct_transformers() {
        let registry = registry();
        let (source, target) = schemas();
        let a = MappingSpec::define::<Source, Target>(&source, &target).build();
        let b = MappingSpec::define::<Source, Target>(&source, &target).build();

        let first = registry
            .provide(source.token(), target.token(), ContextToken::Spec(a.id()))
            .unwrap();
        let second = registry
            .provide(source.token(), target.token(), ContextToken::Spec(b.id()))
            .unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_pair_is_unresolved() {
        let registry = registry();
        let (source, target) = schemas();
        let spec = MappingSpec::define::<Source, Target>(&source, &target).build();

        // Reversed pair has no definition.
        let result = registry.provide(
            target.token(),
            source.token(),
            ContextToken::Spec(spec.id()),
        );
        assert!(matches!(
            result,
            Err(MapError::UnresolvedDefinition { .. })
        ));
    }
}
