// This module implements the two-phase transformation protocol. convert (phase
// 1) reserves a forward-reference cell in the shared cache for the source
// object, then runs every rule's fetch in declaration order; a revisited source
// returns the existing cell untouched, which is how recursion through delegate
// rules terminates. execute (phase 2) is idempotent on resolved cells;
// otherwise it constructs a default target instance, resolves the cell to that
// instance BEFORE applying any rule, and then applies the phase-1 intermediates
// in declaration order. That construct-resolve-apply ordering is the invariant
// that lets a ring such as parent -> child -> parent terminate: the re-entrant
// execute observes the already-resolved cell and hands back the instance still
// under construction. Phase-1 intermediates are held per cell until execute
// consumes them; executing a cell that was never converted is a fatal
// phase-order violation.

//! The two-phase convert/apply engine.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::access::handle::ObjectHandle;
use crate::access::value::Value;
use crate::engine::cache::{CacheKey, TransformCache};
use crate::engine::forward_ref::ForwardRef;
use crate::error::{MapError, MapResult};
use crate::rules::rule::Fetched;
use crate::rules::spec::MappingSpec;

/// Runs the two-phase protocol for one specification against one shared
/// cache.
pub struct Transformer {
    spec: Rc<MappingSpec>,
    cache: Rc<TransformCache>,
    /// Phase-1 intermediates keyed by the cell they will resolve.
    pending: RefCell<HashMap<usize, Vec<Fetched>>>,
}

fn cell_key(cell: &Rc<ForwardRef>) -> usize {
    Rc::as_ptr(cell) as usize
}

impl Transformer {
    pub(crate) fn new(spec: Rc<MappingSpec>, cache: Rc<TransformCache>) -> Self {
        Self {
            spec,
            cache,
            pending: RefCell::new(HashMap::new()),
        }
    }

    pub fn spec(&self) -> &Rc<MappingSpec> {
        &self.spec
    }

    /// Phase 1: gather values from the source graph.
    ///
    /// Returns the forward-reference cell for the (source identity, target
    /// type) pair. On a revisit the existing cell is returned unchanged; it
    /// may still be unresolved when it belongs to an ancestor call that is
    /// still on the stack.
    pub fn convert(&self, source: &ObjectHandle) -> MapResult<Rc<ForwardRef>> {
        let target = self.spec.target_type().token();
        let key = CacheKey::new(source.identity(), target);
        if let Some(cell) = self.cache.lookup(&key) {
            return Ok(cell);
        }

        let (cell, _) = self.cache.get_or_create(source.node(), target);
        log::trace!(
            "converting {} -> {}",
            source.schema().type_name(),
            self.spec.target_type().type_name()
        );
        let mut fetched = Vec::with_capacity(self.spec.rules().len());
        for rule in self.spec.rules() {
            fetched.push(rule.fetch(source)?);
        }
        self.pending.borrow_mut().insert(cell_key(&cell), fetched);
        Ok(cell)
    }

    /// Phase 2: construct the target and apply the gathered values.
    ///
    /// Idempotent: a resolved cell returns immediately with no further
    /// writes. Executing an unresolved cell that this transformer never
    /// converted is a phase-order violation.
    pub fn execute(&self, cell: &Rc<ForwardRef>) -> MapResult<()> {
        if cell.is_resolved() {
            return Ok(());
        }

        let fetched = self
            .pending
            .borrow_mut()
            .remove(&cell_key(cell))
            .ok_or(MapError::PhaseOrder {
                reason: "execute() can only run after convert(); call convert() first",
            })?;

        let schema = self.spec.target_type();
        let node = schema
            .construct_ref()
            .map_err(|e| MapError::from_access(schema.type_name(), e))?;
        let target = ObjectHandle::bind(node.clone(), schema.clone())
            .map_err(|e| MapError::from_access(schema.type_name(), e))?;

        // Resolve before applying any rule, so a re-entrant execute for this
        // cell observes the instance under construction instead of recursing.
        cell.resolve(Value::Object(node));
        log::trace!("executing rules for {}", schema.type_name());

        for (rule, intermediate) in self.spec.rules().iter().zip(fetched) {
            rule.apply(&target, intermediate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::schema::TypeSchema;
    use crate::rules::spec::MappingSpec;
    use std::cell::RefCell as StdRefCell;

    #[derive(Default)]
    struct Source {
        id: i64,
    }

    #[derive(Default)]
    struct Target {
        id: i64,
    }

    fn source_schema() -> Rc<TypeSchema> {
        TypeSchema::of::<Source>("Source")
            .constructable()
            .property(
                "id",
                |s| Value::of(s.id),
                |s, v| {
                    s.id = v.to_scalar::<i64>()?;
                    Ok(())
                },
            )
            .build()
    }

    fn target_schema() -> Rc<TypeSchema> {
        TypeSchema::of::<Target>("Target")
            .constructable()
            .property(
                "id",
                |s| Value::of(s.id),
                |s, v| {
                    s.id = v.to_scalar::<i64>()?;
                    Ok(())
                },
            )
            .build()
    }

    fn transformer() -> Transformer {
        let spec = MappingSpec::define::<Source, Target>(&source_schema(), &target_schema())
            .convert("id", "id")
            .build();
        Transformer::new(spec, Rc::new(TransformCache::new()))
    }

    fn source_handle(id: i64) -> ObjectHandle {
        ObjectHandle::new(Rc::new(StdRefCell::new(Source { id })), &source_schema()).unwrap()
    }

    #[test]
    fn test_convert_then_execute() {
        let transformer = transformer();
        let source = source_handle(7);

        let cell = transformer.convert(&source).unwrap();
        assert!(!cell.is_resolved());

        transformer.execute(&cell).unwrap();
        let target = cell
            .value()
            .unwrap()
            .to_reference::<Target>()
            .unwrap()
            .unwrap();
        assert_eq!(target.borrow().id, 7);
    }

    #[test]
    fn test_execute_before_convert_is_fatal() {
        let transformer = transformer();
        let stray = Rc::new(ForwardRef::new());
        assert!(matches!(
            transformer.execute(&stray),
            Err(MapError::PhaseOrder { .. })
        ));
    }

    #[test]
    fn test_execute_is_idempotent() {
        let transformer = transformer();
        let source = source_handle(3);

        let cell = transformer.convert(&source).unwrap();
        transformer.execute(&cell).unwrap();
        let first = cell.value().unwrap().to_reference::<Target>().unwrap().unwrap();

        transformer.execute(&cell).unwrap();
        let second = cell.value().unwrap().to_reference::<Target>().unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reconverting_reuses_the_cached_cell() {
        let transformer = transformer();
        let source = source_handle(3);

        let first = transformer.convert(&source).unwrap();
        let second = transformer.convert(&source).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_non_constructable_target_fails_execute() {
        struct Locked;
        let locked = TypeSchema::of::<Locked>("Locked").build();
        let spec = MappingSpec::define::<Source, Locked>(&source_schema(), &locked).build();
        let transformer = Transformer::new(spec, Rc::new(TransformCache::new()));

        let cell = transformer.convert(&source_handle(1)).unwrap();
        assert!(matches!(
            transformer.execute(&cell),
            Err(MapError::NotConstructable { .. })
        ));
    }
}
