//! Static market-data availability

use crate::features::resolution::ports::MarketDataAvailability;
use crate::shared::models::{TargetSpec, TargetType};
use std::collections::{HashMap, HashSet};

/// Set of observable (target, value name) pairs
///
/// Value names may also be declared observable for every target of a type,
/// e.g. `MARKET_VALUE` on all securities.
#[derive(Debug, Clone, Default)]
pub struct AvailabilitySet {
    by_target: HashMap<TargetSpec, HashSet<String>>,
    by_type: HashMap<TargetType, HashSet<String>>,
}

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> AvailabilitySetBuilder {
        AvailabilitySetBuilder::default()
    }

    pub fn insert(&mut self, target: TargetSpec, value_name: impl Into<String>) {
        self.by_target
            .entry(target)
            .or_default()
            .insert(value_name.into());
    }

    pub fn insert_for_type(&mut self, target_type: TargetType, value_name: impl Into<String>) {
        self.by_type
            .entry(target_type)
            .or_default()
            .insert(value_name.into());
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(HashSet::len).sum::<usize>()
            + self.by_type.values().map(HashSet::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MarketDataAvailability for AvailabilitySet {
    fn is_available(&self, target: &TargetSpec, value_name: &str) -> bool {
        self.by_type
            .get(&target.target_type)
            .is_some_and(|names| names.contains(value_name))
            || self
                .by_target
                .get(target)
                .is_some_and(|names| names.contains(value_name))
    }
}

#[derive(Debug, Default)]
pub struct AvailabilitySetBuilder {
    set: AvailabilitySet,
}

impl AvailabilitySetBuilder {
    pub fn with(mut self, target: TargetSpec, value_name: impl Into<String>) -> Self {
        self.set.insert(target, value_name);
        self
    }

    pub fn with_for_type(mut self, target_type: TargetType, value_name: impl Into<String>) -> Self {
        self.set.insert_for_type(target_type, value_name);
        self
    }

    pub fn build(self) -> AvailabilitySet {
        self.set
    }
}
