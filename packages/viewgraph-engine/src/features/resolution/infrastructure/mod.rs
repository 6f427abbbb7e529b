//! Resolution infrastructure

mod availability;
mod context;
mod resolver;

pub use availability::{AvailabilitySet, AvailabilitySetBuilder};
pub use context::ResolutionContext;
pub use resolver::{resolve_one, Resolver};
