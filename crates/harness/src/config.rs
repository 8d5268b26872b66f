//! Harness configuration
//!
//! Everything has a default matching the rubric, so an empty or partial
//! TOML file is valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use notegrade_common::Tier;

use crate::error::{HarnessError, HarnessResult};

/// Top-level harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub browser: BrowserConfig,
    pub audit: AuditConfig,
    pub tiers: TierProfiles,
    pub run: RunConfig,
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if !path.exists() {
            return Err(HarnessError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> HarnessResult<()> {
        if self.audit.api_path.trim().is_empty() {
            return Err(HarnessError::Config("audit.api_path must not be empty".into()));
        }
        if self.audit.loading_probe_delay_ms >= self.audit.first_get_delay_ms {
            return Err(HarnessError::Config(format!(
                "audit.loading_probe_delay_ms ({}) must be below audit.first_get_delay_ms ({})",
                self.audit.loading_probe_delay_ms, self.audit.first_get_delay_ms
            )));
        }
        if self.run.deadline_secs == 0 {
            return Err(HarnessError::Config("run.deadline_secs must be positive".into()));
        }
        for (tier, profile) in [(Tier::Sub1, &self.tiers.sub1), (Tier::Sub2, &self.tiers.sub2)] {
            if profile.start.trim().is_empty() {
                return Err(HarnessError::Config(format!("tiers.{tier}.start must not be empty")));
            }
        }
        Ok(())
    }

    pub fn profile(&self, tier: Tier) -> &TierProfile {
        match tier {
            Tier::Sub1 => &self.tiers.sub1,
            Tier::Sub2 => &self.tiers.sub2,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Browser and bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub engine: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    /// Node executable used to run the Playwright bridge
    pub node_binary: String,
    /// Upper bound for a single driver command
    pub command_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: Browser::Chromium,
            headless: true,
            viewport: Viewport { width: 1280, height: 720 },
            node_binary: "node".to_string(),
            command_timeout_ms: 30_000,
            navigation_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Check timings, marker lists and the grading API location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// URL substring identifying requests to the grading API
    pub api_path: String,
    /// Artificial delay applied to the first list request
    pub first_get_delay_ms: u64,
    /// Pause between the first list request and the loading-indicator scan
    pub loading_probe_delay_ms: u64,
    /// How long to wait for the first list request at all
    pub loading_wait_ms: u64,
    /// Pause after submitting a form
    pub submit_settle_ms: u64,
    /// How long a submitted marker may take to show up
    pub echo_timeout_ms: u64,
    /// Pause after clicking a control or sweeping overlays
    pub click_settle_ms: u64,
    /// Pause after resizing the viewport
    pub reflow_settle_ms: u64,
    pub mobile_viewport: Viewport,
    pub loading_markers: Vec<String>,
    pub error_markers: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            api_path: "notes-api.dicoding.dev/v2/notes".to_string(),
            first_get_delay_ms: 2_000,
            loading_probe_delay_ms: 500,
            loading_wait_ms: 15_000,
            submit_settle_ms: 1_000,
            echo_timeout_ms: 3_000,
            click_settle_ms: 1_000,
            reflow_settle_ms: 1_000,
            mobile_viewport: Viewport { width: 390, height: 844 },
            loading_markers: vec!["loading".to_string(), "tunggu".to_string()],
            error_markers: vec![
                "gagal".to_string(),
                "error".to_string(),
                "periksa koneksi".to_string(),
            ],
        }
    }
}

impl AuditConfig {
    pub fn first_get_delay(&self) -> Duration {
        Duration::from_millis(self.first_get_delay_ms)
    }

    pub fn loading_probe_delay(&self) -> Duration {
        Duration::from_millis(self.loading_probe_delay_ms)
    }

    pub fn loading_wait(&self) -> Duration {
        Duration::from_millis(self.loading_wait_ms)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_millis(self.submit_settle_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    pub fn reflow_settle(&self) -> Duration {
        Duration::from_millis(self.reflow_settle_ms)
    }

    /// Zero every pause. Used by tests driving a fake page.
    pub fn without_delays(mut self) -> Self {
        self.first_get_delay_ms = 0;
        self.loading_probe_delay_ms = 0;
        self.submit_settle_ms = 0;
        self.click_settle_ms = 0;
        self.reflow_settle_ms = 0;
        self
    }
}

/// How to decide that a freshly spawned server is ready
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReadinessConfig {
    /// Sleep for a fixed settle time
    FixedDelay { ms: u64 },
    /// Watch stdout/stderr for a listen address
    ScanOutput { timeout_ms: u64 },
}

/// Commands and readiness policy for one tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierProfile {
    pub install: Option<String>,
    pub build: Option<String>,
    pub start: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub readiness: ReadinessConfig,
    /// Used until the server reports its own address
    pub default_url: String,
    /// Poll the base URL over HTTP once the server looks ready
    #[serde(default)]
    pub http_probe: bool,
    /// Script names the manifest must declare
    #[serde(default)]
    pub required_scripts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierProfiles {
    pub sub1: TierProfile,
    pub sub2: TierProfile,
}

impl Default for TierProfiles {
    fn default() -> Self {
        Self {
            sub1: TierProfile {
                install: Some("npm init -y && npm install live-server".to_string()),
                build: None,
                start: "npx live-server --port=8080 --no-browser".to_string(),
                env: BTreeMap::new(),
                readiness: ReadinessConfig::FixedDelay { ms: 3_000 },
                default_url: "http://localhost:8080".to_string(),
                http_probe: false,
                required_scripts: Vec::new(),
            },
            sub2: TierProfile {
                install: Some("npm install".to_string()),
                build: Some("npm run build".to_string()),
                start: "npm run start-dev -- --port 8080".to_string(),
                env: BTreeMap::from([("PORT".to_string(), "8080".to_string())]),
                readiness: ReadinessConfig::ScanOutput { timeout_ms: 10_000 },
                default_url: "http://localhost:8080".to_string(),
                http_probe: true,
                required_scripts: vec!["start-dev".to_string(), "build".to_string()],
            },
        }
    }
}

/// Whole-run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock ceiling for one grading run
    pub deadline_secs: u64,
    /// Grace period between SIGTERM and SIGKILL at teardown
    pub shutdown_grace_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 300,
            shutdown_grace_ms: 500,
        }
    }
}

impl RunConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HarnessConfig::from_toml("").unwrap();
        assert_eq!(config.audit.api_path, "notes-api.dicoding.dev/v2/notes");
        assert_eq!(config.audit.mobile_viewport, Viewport { width: 390, height: 844 });
        assert_eq!(config.run.deadline(), Duration::from_secs(300));
        assert!(config.profile(Tier::Sub1).build.is_none());
        assert_eq!(
            config.profile(Tier::Sub2).readiness,
            ReadinessConfig::ScanOutput { timeout_ms: 10_000 }
        );
    }

    #[test]
    fn test_partial_override() {
        let toml = r#"
[browser]
headless = false

[audit]
api_path = "localhost:3000/api/notes"
error_markers = ["failed"]

[run]
deadline_secs = 60

[tiers.sub1]
start = "python3 -m http.server 9000"
default_url = "http://localhost:9000"
readiness = { mode = "fixed_delay", ms = 500 }
"#;
        let config = HarnessConfig::from_toml(toml).unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport.width, 1280);
        assert_eq!(config.audit.api_path, "localhost:3000/api/notes");
        assert_eq!(config.audit.error_markers, vec!["failed"]);
        assert_eq!(config.audit.loading_markers.len(), 2);
        assert_eq!(config.run.deadline_secs, 60);
        assert_eq!(config.tiers.sub1.start, "python3 -m http.server 9000");
        assert!(config.tiers.sub1.install.is_none());
        assert_eq!(config.tiers.sub2.build.as_deref(), Some("npm run build"));
    }

    #[test]
    fn test_rejects_empty_api_path() {
        let err = HarnessConfig::from_toml("[audit]\napi_path = \"\"\n").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_rejects_probe_delay_past_first_get() {
        let err = HarnessConfig::from_toml("[audit]\nfirst_get_delay_ms = 500\nloading_probe_delay_ms = 500\n")
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));

        let config = HarnessConfig::from_toml("[audit]\nfirst_get_delay_ms = 3000\nloading_probe_delay_ms = 1000\n");
        assert!(config.is_ok());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = HarnessConfig::load(Path::new("/nonexistent/notegrade.toml")).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }
}
