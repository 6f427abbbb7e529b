//! Shared models

mod target;
mod version;

pub use target::{
    Aggregate, ComputationTarget, PortfolioNodeTarget, Position, Security, TargetSpec, TargetType,
    Trade,
};
pub use version::{VersionCorrection, VersionCorrectionParseError};
