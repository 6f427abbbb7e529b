// Graph Builder Infrastructure
//
// Builder over the shared resolution context, and in-memory sources

pub mod builder;
pub mod sources;

pub use builder::{requested_outputs, BuildOutput, GraphBuilder, RequestedOutput};
pub use sources::{InMemoryPortfolioSource, InMemoryViewDefinitionSource, StaticMarketData};
