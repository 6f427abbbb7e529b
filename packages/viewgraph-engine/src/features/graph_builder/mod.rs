// Graph Builder - View to Dependency Graph compilation
//
// Expands a view definition over a portfolio's targets into requested outputs,
// resolves each through the shared resolution context, and extracts one
// dependency graph per calculation configuration.
//
// ## Architecture
// - Domain: view definitions, portfolios, target universe, graphs, errors
// - Ports: view definition / portfolio / market-data sources
// - Infrastructure: `GraphBuilder`, in-memory sources
// - Application: `GraphExecutor` (sequential topological evaluation)

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{ExecutionResults, GraphExecutor};

pub use domain::{
    CalculationConfiguration, CompileError, CompileResult, DependencyGraph, ExecutionError,
    Portfolio, PortfolioPosition, PortfolioRequirement, PortfolioTrade, PortfolioTreeNode,
    RequiredFailure, SpecificRequirement, TargetUniverse, TerminalOutput, UnresolvedOutput,
    ViewDefinition,
};

pub use infrastructure::{
    requested_outputs, BuildOutput, GraphBuilder, InMemoryPortfolioSource,
    InMemoryViewDefinitionSource, RequestedOutput, StaticMarketData,
};

pub use ports::{MarketDataProvider, PortfolioSource, ViewDefinitionSource};
