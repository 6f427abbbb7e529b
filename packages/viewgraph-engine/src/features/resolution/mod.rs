//! Resolver
//!
//! Turns one desired value into a chosen function application plus resolved
//! inputs, recursively, down to observable market data.
//!
//! ## Architecture
//! - Domain: dependency nodes, resolution errors, candidate ordering
//! - Ports: market-data availability oracle, target resolver
//! - Infrastructure: memoizing DFS `Resolver` over a shared `ResolutionContext`

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    AmbiguityMode, Candidate, CandidateComparator, DependencyNode, FewestWildcards, NodeId,
    NodeKind, RegistrationOrder, RejectedCandidate, RejectionReason, ResolutionError,
    ResolutionFailure, ResolutionStats, TieBreakPolicy,
};
pub use infrastructure::{
    resolve_one, AvailabilitySet, AvailabilitySetBuilder, ResolutionContext, Resolver,
};
pub use ports::{MarketDataAvailability, TargetResolver};
