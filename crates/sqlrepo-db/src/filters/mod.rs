//! Filter specifications, the operator library and filter converters.
//!
//! - [`spec`] - [`Filters`], [`Filter`] and [`FilterMap`]
//! - [`operators`] - `(field, value) -> predicate` functions and the closed
//!   operator sets
//! - [`guards`] - shape checks for filter maps
//! - [`converters`] - [`FilterConverter`], the validated translation entry point

pub mod converters;
pub mod guards;
pub mod operators;
pub mod spec;

pub use converters::FilterConverter;
pub use operators::{AdvancedOperator, DjangoLookup, OperatorFn};
pub use spec::{Filter, FilterMap, Filters};
