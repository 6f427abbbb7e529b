//! Usecase Layer - compile entry points
//!
//! `ViewCompiler` ties the catalog, sources, graph builder and view cache
//! together; `SingleFlight` makes concurrent compiles of one key share a
//! single graph-builder run.

pub mod metrics;
pub mod single_flight;
pub mod view_compiler;

pub use metrics::CompilerMetrics;
pub use single_flight::{Attached, Completion, CompileOutcome, InFlight, SingleFlight, WaiterGuard};
pub use view_compiler::{CompileRequest, CompilerStats, ViewCompiler, ViewCompilerBuilder};
