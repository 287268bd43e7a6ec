// This module validates a mapping specification for completeness against a
// type pair. Validation is a pure function: it never raises and never stops at
// the first finding. Both types must be default-constructable; for a
// constructable target, every required property must be covered by some rule's
// target accessor (an error) and every mutable property should be (a warning);
// for a constructable source, every property should be consumed by some rule's
// source accessor (a warning). Delegate rules carry both accessors and count
// on both sides.

//! Completeness validation for mapping specifications.

pub mod result;

pub use result::ValidationResult;

use std::rc::Rc;

use crate::access::schema::TypeSchema;
use crate::rules::spec::MappingSpec;

/// Check whether `spec` is complete for mapping between the given types.
///
/// All findings accumulate into the result; nothing fails fast.
pub fn validate(
    spec: &MappingSpec,
    source: &Rc<TypeSchema>,
    target: &Rc<TypeSchema>,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    let source_constructable = source.is_constructable();
    if !source_constructable {
        result.add_error(format_args!(
            "no zero-argument constructor is registered for type {}",
            source.type_name()
        ));
    }

    let target_constructable = target.is_constructable();
    if !target_constructable {
        result.add_error(format_args!(
            "no zero-argument constructor is registered for type {}",
            target.type_name()
        ));
    }

    if target_constructable {
        let all_required_mapped = target
            .properties()
            .filter(|property| property.is_required())
            .all(|property| covers_target(spec, property.name()));
        if !all_required_mapped {
            result.add_error(format_args!(
                "not all required properties of target type {} are mapped",
                target.type_name()
            ));
        }

        let all_mutable_mapped = target
            .properties()
            .filter(|property| property.is_mutable())
            .all(|property| covers_target(spec, property.name()));
        if !all_mutable_mapped {
            result.add_warning(format_args!(
                "not all properties of target type {} are mapped",
                target.type_name()
            ));
        }
    }

    if source_constructable {
        let all_source_mapped = source
            .properties()
            .all(|property| covers_source(spec, property.name()));
        if !all_source_mapped {
            result.add_warning(format_args!(
                "not all properties of source type {} are mapped",
                source.type_name()
            ));
        }
    }

    result
}

fn covers_target(spec: &MappingSpec, property: &str) -> bool {
    spec.rules().iter().any(|rule| rule.maps_to_property(property))
}

fn covers_source(spec: &MappingSpec, property: &str) -> bool {
    spec.rules()
        .iter()
        .any(|rule| rule.maps_from_property(property))
}
