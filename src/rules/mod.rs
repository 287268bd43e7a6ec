//! Declarative mapping rules and specifications.

pub mod rule;
pub mod spec;

pub use rule::{AddRule, ConvertRule, Converter, DefaultFn, DelegateRule, DropRule, MappingRule};
pub use spec::{MappingSpec, SpecBuilder, SpecId};
