//! Graph Builder domain
//!
//! Pure models: view definitions, portfolio trees, dependency graphs and the
//! compile error taxonomy.

mod error;
mod graph;
mod portfolio;
mod view;

pub use error::{CompileError, CompileResult, ExecutionError, RequiredFailure};
pub use graph::{DependencyGraph, TerminalOutput, UnresolvedOutput};
pub use portfolio::{
    Portfolio, PortfolioPosition, PortfolioTrade, PortfolioTreeNode, TargetUniverse,
};
pub use view::{
    CalculationConfiguration, PortfolioRequirement, SpecificRequirement, ViewDefinition,
};
