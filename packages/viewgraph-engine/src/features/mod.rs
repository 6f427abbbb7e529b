//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure business logic (no external dependencies)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - External dependency implementations

pub mod value_model;

pub mod function_catalog;

// Function resolution: requirement -> function application tree
pub mod resolution;

// Graph extraction per calculation configuration, plus execution
pub mod graph_builder;

// Compiled-view cache: in-memory, no-op, tiered (moka hot tier + durable store)
pub mod cache;
