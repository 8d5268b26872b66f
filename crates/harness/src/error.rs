//! Error types for the grading harness

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Build failed: `{command}` exited with {status}")]
    Build { command: String, status: String },

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Rubric(#[from] notegrade_common::Error),
}

/// Coarse classification used to decide reporting and exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Nothing was launched, there is no report worth printing
    Setup,
    /// The submission's own build failed
    Build,
    /// Something broke while the server or browser was live
    Runtime,
}

impl HarnessError {
    pub fn class(&self) -> ErrorClass {
        match self {
            HarnessError::Setup(_)
            | HarnessError::Rejected(_)
            | HarnessError::Manifest(_)
            | HarnessError::Config(_)
            | HarnessError::Toml(_)
            | HarnessError::Zip(_)
            | HarnessError::Rubric(_) => ErrorClass::Setup,
            HarnessError::Build { .. } => ErrorClass::Build,
            _ => ErrorClass::Runtime,
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
