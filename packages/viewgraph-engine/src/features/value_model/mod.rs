//! Value Model
//!
//! Immutable descriptions of requested and produced values:
//! - `PropertyConstraintSet`: wildcard / finite-set constraints per property
//! - `ValueRequirement`: what a caller (or a function's input) asks for
//! - `ValueSpecification`: what a function produces

pub mod properties;
pub mod requirement;

pub use properties::{
    PropertyConstraint, PropertyConstraintSet, PropertyConstraintSetBuilder, PropertyName,
    PropertyValue,
};
pub use requirement::{
    ValueRequirement, ValueSpecification, FUNCTION_PROPERTY, MARKET_DATA_FUNCTION,
};
