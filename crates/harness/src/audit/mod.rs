//! Audit engine
//!
//! Runs an ordered plan of [`AuditStep`]s against one live page and writes
//! outcomes into a shared [`Report`]. Steps run strictly in order because
//! later ones depend on DOM state left behind by earlier ones (a submitted
//! note, a dismissed overlay, an archived item).
//!
//! A step that cannot find what it is looking for records a failure for its
//! rubric item and returns `Ok`. Only driver-level failures are errors, and
//! they stop the plan; outcomes recorded so far stay in the report.

pub mod census;
pub mod content;
pub mod form;
pub mod layout;
pub mod network;
pub mod sniper;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use notegrade_common::{Report, RubricItem, Tier};

use crate::config::AuditConfig;
use crate::driver::BrowserDriver;
use crate::error::HarnessResult;
use crate::interceptor::NetworkInterceptor;
use crate::matchers::{self, OverlaySweep};

/// A single audit action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStep {
    /// All fixture notes visible
    RenderFixture,
    /// Submit a unique marker and wait for it to show up
    SubmitForm,
    /// Submit once while the interceptor aborts the request
    InjectCreateFailure,
    /// Submit an extra note so destructive actions have a target
    SeedTarget,
    /// Custom elements and their attributes
    ComponentCensus,
    /// Grid or flex layout in use
    Layout,
    /// Native or declared input validation
    Validation,
    /// No horizontal overflow on a phone-sized viewport
    Viewport,
    /// Click archive, unarchive and delete controls
    Sniper,
    /// Click matching overlay buttons
    Sweep(OverlaySweep),
    /// Grade the API traffic seen so far
    ApiVerdict,
}

impl fmt::Display for AuditStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditStep::RenderFixture => "render-fixture",
            AuditStep::SubmitForm => "submit-form",
            AuditStep::InjectCreateFailure => "inject-create-failure",
            AuditStep::SeedTarget => "seed-target",
            AuditStep::ComponentCensus => "component-census",
            AuditStep::Layout => "layout",
            AuditStep::Validation => "validation",
            AuditStep::Viewport => "viewport",
            AuditStep::Sniper => "sniper",
            AuditStep::Sweep(_) => "sweep-overlays",
            AuditStep::ApiVerdict => "api-verdict",
        };
        f.write_str(name)
    }
}

/// Ordered steps for a tier
#[derive(Debug, Clone, Copy)]
pub struct AuditPlan {
    /// Watch for a loading state while the page opens
    pub probe_loading: bool,
    pub steps: &'static [AuditStep],
}

const SUB1_STEPS: &[AuditStep] = &[
    AuditStep::RenderFixture,
    AuditStep::SubmitForm,
    AuditStep::ComponentCensus,
    AuditStep::Layout,
    AuditStep::Validation,
    AuditStep::Viewport,
];

const SUB2_STEPS: &[AuditStep] = &[
    AuditStep::InjectCreateFailure,
    AuditStep::Sweep(matchers::DISMISS_OVERLAYS),
    AuditStep::SubmitForm,
    AuditStep::Sweep(matchers::CONFIRM_OVERLAYS),
    AuditStep::SeedTarget,
    AuditStep::ComponentCensus,
    AuditStep::Layout,
    AuditStep::Sniper,
    AuditStep::ApiVerdict,
];

impl AuditPlan {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Sub1 => Self { probe_loading: false, steps: SUB1_STEPS },
            Tier::Sub2 => Self { probe_loading: true, steps: SUB2_STEPS },
        }
    }
}

/// Timing record of an executed step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

pub struct AuditEngine<'a> {
    driver: &'a dyn BrowserDriver,
    config: &'a AuditConfig,
    interceptor: Option<Arc<NetworkInterceptor>>,
    trace: Vec<StepResult>,
}

impl<'a> AuditEngine<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, config: &'a AuditConfig) -> Self {
        Self {
            driver,
            config,
            interceptor: None,
            trace: Vec::new(),
        }
    }

    /// Read API traffic from this interceptor
    pub fn with_interceptor(mut self, interceptor: Arc<NetworkInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Navigate to the app, watching for a loading state if the plan asks for it
    pub async fn open(&mut self, url: &str, plan: &AuditPlan, report: &mut Report) -> HarnessResult<()> {
        info!("Opening {}", url);
        let start = Instant::now();

        let result = match (&self.interceptor, plan.probe_loading) {
            (Some(interceptor), true) => {
                let (navigation, loading) = tokio::join!(
                    self.driver.navigate(url),
                    network::probe_loading_indicator(self.driver, interceptor, self.config),
                );
                match loading {
                    Ok(seen) => {
                        report.record_bool(RubricItem::LoadingIndicator, seen);
                    }
                    Err(e) => debug!("Loading probe failed: {}", e),
                }
                navigation
            }
            _ => self.driver.navigate(url).await,
        };

        self.push_trace("open", start, result.as_ref().err().map(|e| e.to_string()));
        result
    }

    /// Run every step of the plan in order
    pub async fn run(&mut self, plan: &AuditPlan, report: &mut Report) -> HarnessResult<()> {
        info!("Running {} audit step(s)", plan.steps.len());
        for step in plan.steps {
            self.execute_step(*step, report).await?;
        }
        Ok(())
    }

    /// Execute a single step
    pub async fn execute_step(&mut self, step: AuditStep, report: &mut Report) -> HarnessResult<()> {
        let start = Instant::now();
        debug!("Executing step: {}", step);

        let driver = self.driver;
        let config = self.config;

        let result = match step {
            AuditStep::RenderFixture => content::check_required_notes(driver, report).await,
            AuditStep::SubmitForm => form::check_submission(driver, config, report).await,
            AuditStep::InjectCreateFailure => {
                network::check_error_feedback(driver, config, self.interceptor.as_deref(), report).await
            }
            AuditStep::SeedTarget => form::seed_target(driver, config).await,
            AuditStep::ComponentCensus => census::check_components(driver, report).await,
            AuditStep::Layout => layout::check_layout(driver, report).await,
            AuditStep::Validation => form::check_validation(driver, report).await,
            AuditStep::Viewport => layout::check_viewport(driver, config, report).await,
            AuditStep::Sniper => sniper::run(driver, config).await,
            AuditStep::Sweep(sweep) => sniper::sweep(driver, &sweep, config).await.map(|_| ()),
            AuditStep::ApiVerdict => {
                network::check_api_traffic(self.interceptor.as_deref(), report);
                Ok(())
            }
        };

        if let Err(e) = &result {
            error!("Step {} failed: {}", step, e);
        }
        self.push_trace(&step.to_string(), start, result.as_ref().err().map(|e| e.to_string()));
        result
    }

    fn push_trace(&mut self, step: &str, start: Instant, error: Option<String>) {
        self.trace.push(StepResult {
            step: step.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        });
    }

    /// Steps executed so far
    pub fn trace(&self) -> &[StepResult] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<StepResult> {
        self.trace
    }
}
