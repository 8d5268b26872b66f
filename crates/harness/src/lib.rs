//! notegrade Grading Harness
//!
//! This crate grades a notes-app web submission end to end:
//! - Screens and unpacks the submission, checks its manifest and sources
//! - Installs, builds and spawns the dev server as a process group
//! - Controls Playwright through a JSON-lines bridge process
//! - Intercepts API traffic to inject failures and count REST calls
//! - Runs the tier's audit plan and fills in the rubric report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GradingRun (deadline)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Submission::open() -> project root                         │
//! │  analysis::analyze() -> StaticFindings                      │
//! │  run_command(install / build)                               │
//! │  ServerHandle::launch() -> base URL                         │
//! │  PlaywrightDriver::launch(interceptor?)                     │
//! │    └── AuditEngine                                          │
//! │          ├── open(url)  ‖  loading probe                    │
//! │          └── run(AuditPlan) -> Report                       │
//! │  ServerHandle::stop()                                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod audit;
pub mod config;
pub mod driver;
pub mod error;
pub mod intake;
pub mod interceptor;
pub mod matchers;
pub mod playwright;
pub mod runner;
pub mod scripts;
pub mod server;

pub use audit::{AuditEngine, AuditPlan, AuditStep};
pub use config::HarnessConfig;
pub use driver::BrowserDriver;
pub use error::{ErrorClass, HarnessError, HarnessResult};
pub use runner::GradingRun;
