/*
 * Viewgraph Engine - view compilation over a function catalog
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Computation targets, version/correction tokens
 * - features/    : Vertical slices (value_model → function_catalog → resolution → graph_builder → cache)
 * - usecases/    : ViewCompiler (cache + single-flight + bounded worker pool)
 * - config/      : Presets, YAML, validation
 *
 * Concurrency:
 * - Graph building runs on a dedicated rayon pool
 * - Concurrent compiles of one key share a single build
 */

#![allow(clippy::type_complexity)] // Executor closures
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

/// Usecase layer (ViewCompiler)
pub mod usecases;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{CacheConfig, EngineConfig, Preset, ResolverConfig, WorkerConfig};
pub use errors::{EngineError, Result};
pub use features::cache::{
    CacheKey, CompiledView, InMemoryViewCache, NoOpViewCache, SetOutcome, TieredViewCache,
    ViewCache,
};
pub use features::function_catalog::{
    CatalogSnapshot, ConfiguredFunction, FunctionCatalog, FunctionDefinition, FunctionId,
    InputTarget,
};
pub use features::graph_builder::{
    CompileError, DependencyGraph, GraphExecutor, Portfolio, ViewDefinition,
};
pub use features::value_model::{PropertyConstraintSet, ValueRequirement, ValueSpecification};
pub use shared::models::{ComputationTarget, TargetSpec, TargetType, VersionCorrection};
pub use usecases::{CompileRequest, CompilerStats, ViewCompiler};
