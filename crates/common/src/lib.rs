//! notegrade Common Library
//!
//! Shared data model for the grading harness: rubric tiers and their
//! schemas, tri-state outcomes, the report aggregator, API traffic
//! statistics and the required-notes fixture.

pub mod error;
pub mod fixtures;
pub mod report;
pub mod rubric;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use fixtures::{RequiredNote, REQUIRED_NOTES};
pub use report::{Report, ReportLine};
pub use rubric::{RubricEntry, RubricItem};
pub use types::*;

/// notegrade version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
