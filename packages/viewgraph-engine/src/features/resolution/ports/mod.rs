//! Resolution ports
//!
//! Collaborators the resolver consults but does not own.

use crate::shared::models::{ComputationTarget, TargetSpec};

/// Oracle for directly observable values
pub trait MarketDataAvailability: Send + Sync {
    fn is_available(&self, target: &TargetSpec, value_name: &str) -> bool;
}

impl<F> MarketDataAvailability for F
where
    F: Fn(&TargetSpec, &str) -> bool + Send + Sync,
{
    fn is_available(&self, target: &TargetSpec, value_name: &str) -> bool {
        self(target, value_name)
    }
}

/// Resolves a target reference to its payload
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, spec: &TargetSpec) -> Option<ComputationTarget>;
}
