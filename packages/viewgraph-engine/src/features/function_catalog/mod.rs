//! Function Catalog
//!
//! Registry of `FunctionDefinition`s dispatched by target type (and declared
//! supertypes), versioned by a monotonically increasing epoch.
//!
//! ## Architecture
//! - Domain: `FunctionDefinition` trait, ids, execution inputs and errors
//! - Infrastructure: copy-on-write `FunctionCatalog`, `ConfiguredFunction` builder

pub mod domain;
pub mod infrastructure;

pub use domain::{
    FunctionDefinition, FunctionError, FunctionId, FunctionInputs, FunctionResult,
};
pub use infrastructure::{
    CatalogEntry, CatalogSnapshot, CatalogState, ConfiguredFunction, ConfiguredFunctionBuilder,
    Executor, FunctionCatalog, InputDeclaration, InputTarget, DEFAULT_PRIORITY,
};
