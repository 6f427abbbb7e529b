//! Function Catalog infrastructure

mod catalog;
mod configured_function;

pub use catalog::{CatalogEntry, CatalogSnapshot, CatalogState, FunctionCatalog, DEFAULT_PRIORITY};
pub use configured_function::{
    ConfiguredFunction, ConfiguredFunctionBuilder, Executor, InputDeclaration, InputTarget,
};
