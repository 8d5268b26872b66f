//! Error types for notegrade-common

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting rubric and report data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown rubric tier: {0} (expected sub1 or sub2)")]
    UnknownTier(String),

    #[error("Rubric item {item} is not part of tier {tier}")]
    NotInRubric { item: String, tier: String },
}
