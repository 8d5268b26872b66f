//! Grading run orchestration
//!
//! One [`GradingRun`] takes a submission through intake, static analysis,
//! install and build, then starts the dev server and a browser and runs the
//! tier's audit plan. The [`Report`] is owned by the caller so it survives
//! every failure path, including the deadline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use notegrade_common::{ApiTrafficStats, Report, RubricItem, Tier};

use crate::analysis::{self, PackageManifest};
use crate::audit::{AuditEngine, AuditPlan, StepResult};
use crate::config::HarnessConfig;
use crate::driver::BrowserDriver;
use crate::error::{HarnessError, HarnessResult};
use crate::intake::Submission;
use crate::interceptor::NetworkInterceptor;
use crate::playwright::PlaywrightDriver;
use crate::server::{ServerHandle, ServerSpec};

/// Machine-readable record of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub target: String,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub gates_passed: bool,
    pub score: (usize, usize),
    pub error: Option<String>,
    pub report: &'a Report,
    pub api_traffic: Option<ApiTrafficStats>,
    pub steps: &'a [StepResult],
}

pub struct GradingRun {
    tier: Tier,
    target: PathBuf,
    config: HarnessConfig,
    started: Instant,
    trace: Vec<StepResult>,
    api_traffic: Option<ApiTrafficStats>,
}

impl GradingRun {
    pub fn new(tier: Tier, target: impl Into<PathBuf>, config: HarnessConfig) -> Self {
        Self {
            tier,
            target: target.into(),
            config,
            started: Instant::now(),
            trace: Vec::new(),
            api_traffic: None,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Run under the configured wall-clock deadline
    pub async fn run(&mut self, report: &mut Report) -> HarnessResult<()> {
        let deadline = self.config.run.deadline();
        match tokio::time::timeout(deadline, self.execute(report)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Run exceeded its deadline of {:?}, tearing down", deadline);
                Err(HarnessError::DeadlineExceeded(deadline))
            }
        }
    }

    /// Run every stage without a deadline
    pub async fn execute(&mut self, report: &mut Report) -> HarnessResult<()> {
        info!("Grading {} as {}", self.target.display(), self.tier.title());

        let submission = Submission::open(&self.target)?;
        let root = submission.root();
        let profile = self.config.profile(self.tier).clone();

        let bundler_declared = match self.tier {
            Tier::Sub2 => {
                let manifest = PackageManifest::load(root)?;
                analysis::check_scripts(&manifest, &profile.required_scripts);
                let findings = analysis::analyze(root, &manifest);
                findings.record(report);
                Some(findings.bundler_declared)
            }
            Tier::Sub1 => None,
        };

        if let Some(install) = &profile.install {
            run_command(install, root, &profile.env).await.map_err(|e| match e {
                HarnessError::Build { command, status } => {
                    HarnessError::Setup(format!("install `{command}` exited with {status}"))
                }
                other => other,
            })?;
        }

        if let Some(build) = &profile.build {
            if let Err(e) = run_command(build, root, &profile.env).await {
                report.record_bool(RubricItem::Bundler, false);
                return Err(e);
            }
        }
        if let Some(declared) = bundler_declared {
            report.record_bool(RubricItem::Bundler, declared);
        }

        let spec = ServerSpec::from_profile(&profile, root, self.config.run.shutdown_grace());
        let mut server = ServerHandle::launch(&spec).await?;

        let result = self.audit(&server, root, report).await;
        server.stop().await;
        result
    }

    async fn audit(&mut self, server: &ServerHandle, root: &Path, report: &mut Report) -> HarnessResult<()> {
        let interceptor = match self.tier {
            Tier::Sub2 => Some(Arc::new(NetworkInterceptor::from_config(&self.config.audit))),
            Tier::Sub1 => None,
        };

        let driver = PlaywrightDriver::launch(&self.config.browser, root, interceptor.clone()).await?;
        let plan = AuditPlan::for_tier(self.tier);

        let mut engine = AuditEngine::new(&driver, &self.config.audit);
        if let Some(interceptor) = &interceptor {
            engine = engine.with_interceptor(interceptor.clone());
        }

        let url = server.base_url();
        let mut result = engine.open(&url, &plan, report).await;
        if result.is_ok() {
            result = engine.run(&plan, report).await;
        }

        self.trace = engine.into_trace();
        self.api_traffic = interceptor.as_ref().map(|i| i.stats());

        if let Err(e) = driver.close().await {
            warn!("Failed to close browser: {}", e);
        }
        result
    }

    /// Write `report.json` into the output directory
    pub fn write_results(
        &self,
        output_dir: &Path,
        report: &Report,
        error: Option<&HarnessError>,
    ) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let summary = RunSummary {
            target: self.target.display().to_string(),
            finished_at: Utc::now(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            gates_passed: report.gates_passed() && error.is_none(),
            score: report.score(),
            error: error.map(|e| e.to_string()),
            report,
            api_traffic: self.api_traffic,
            steps: &self.trace,
        };

        let path = output_dir.join("report.json");
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Run a shell command in the project directory, failing on non-zero exit
pub async fn run_command(command: &str, dir: &Path, env: &BTreeMap<String, String>) -> HarnessResult<()> {
    info!("> Executing: {}", command);
    let start = Instant::now();

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .envs(env)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(target: "command", "{}", line);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(20).collect();
        for line in tail.into_iter().rev() {
            warn!(target: "command", "{}", line);
        }
        return Err(HarnessError::Build {
            command: command.to_string(),
            status: output.status.to_string(),
        });
    }

    debug!("`{}` finished in {:?}", command, start.elapsed());
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = BTreeMap::new();
        env.insert("NOTEGRADE_MARK".to_string(), "ok".to_string());
        run_command("test \"$NOTEGRADE_MARK\" = ok && touch built", dir.path(), &env)
            .await
            .unwrap();
        assert!(dir.path().join("built").exists());
    }

    #[tokio::test]
    async fn test_run_command_failure_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command("exit 3", dir.path(), &BTreeMap::new()).await.unwrap_err();
        match err {
            HarnessError::Build { command, status } => {
                assert_eq!(command, "exit 3");
                assert!(status.contains('3'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
