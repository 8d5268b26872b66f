//! Server management - spawning, readiness detection and teardown of the
//! submission's dev server

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{ReadinessConfig, TierProfile};
use crate::error::{HarnessError, HarnessResult};

static LISTEN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)http://(?:localhost|127\.0\.0\.1):\d+").expect("valid listen pattern")
});

/// Extract a `http://localhost:<port>` style address from a line of output
pub fn detect_listen_url(line: &str) -> Option<String> {
    LISTEN_URL.find(line).map(|m| m.as_str().to_string())
}

/// What to run and how to wait for it
#[derive(Debug, Clone)]
pub struct ServerSpec {
    /// Shell command, run through `sh -c`
    pub command: String,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub default_url: String,
    pub readiness: ReadinessConfig,
    pub http_probe: bool,
    pub shutdown_grace: Duration,
}

impl ServerSpec {
    pub fn from_profile(profile: &TierProfile, working_dir: &Path, shutdown_grace: Duration) -> Self {
        Self {
            command: profile.start.clone(),
            working_dir: working_dir.to_path_buf(),
            env: profile.env.clone(),
            default_url: profile.default_url.clone(),
            readiness: profile.readiness.clone(),
            http_probe: profile.http_probe,
            shutdown_grace,
        }
    }
}

/// Latest listen address reported by the server
#[derive(Default)]
struct AddressWatch {
    url: Mutex<Option<String>>,
    found: Notify,
}

impl AddressWatch {
    fn update(&self, url: String) {
        let mut current = self.url.lock();
        if current.as_deref() != Some(url.as_str()) {
            info!("Dev server reported address {}", url);
            *current = Some(url);
        }
        drop(current);
        self.found.notify_one();
    }

    fn get(&self) -> Option<String> {
        self.url.lock().clone()
    }
}

/// Handle to a running server process and its process group
pub struct ServerHandle {
    child: Child,
    pgid: Option<i32>,
    watch: Arc<AddressWatch>,
    default_url: String,
    shutdown_grace: Duration,
    stopped: bool,
}

impl ServerHandle {
    /// Spawn the server in its own process group and start scanning its output.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(spec: &ServerSpec) -> HarnessResult<Self> {
        info!("Spawning dev server: {} (in {})", spec.command, spec.working_dir.display());

        let mut std_cmd = std::process::Command::new("sh");
        std_cmd
            .arg("-c")
            .arg(&spec.command)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Leader of a fresh group, so the whole tree can be signalled at once
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            HarnessError::ServerStartup(format!("failed to spawn `{}`: {}", spec.command, e))
        })?;

        let pgid = child.id().map(|id| id as i32);
        let watch = Arc::new(AddressWatch::default());

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_output(stdout, "stdout", watch.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_output(stderr, "stderr", watch.clone()));
        }

        Ok(Self {
            child,
            pgid,
            watch,
            default_url: spec.default_url.clone(),
            shutdown_grace: spec.shutdown_grace,
            stopped: false,
        })
    }

    /// Start the server and wait until it is ready according to the spec
    pub async fn launch(spec: &ServerSpec) -> HarnessResult<Self> {
        let mut handle = Self::start(spec)?;
        let url = handle.await_readiness(&spec.readiness).await?;
        if spec.http_probe && !handle.wait_for_http(&url, Duration::from_secs(30)).await {
            warn!("Server at {} did not answer HTTP requests, continuing anyway", url);
        }
        info!("Server is up at {}", handle.base_url());
        Ok(handle)
    }

    /// Wait for readiness and return the base URL to audit
    pub async fn await_readiness(&mut self, readiness: &ReadinessConfig) -> HarnessResult<String> {
        match readiness {
            ReadinessConfig::FixedDelay { ms } => {
                debug!("Waiting {} ms for the server to settle", ms);
                sleep(Duration::from_millis(*ms)).await;
                self.ensure_running()?;
            }
            ReadinessConfig::ScanOutput { timeout_ms } => {
                let deadline = Instant::now() + Duration::from_millis(*timeout_ms);
                loop {
                    if self.watch.get().is_some() {
                        break;
                    }
                    self.ensure_running()?;

                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!(
                            "No listen address reported within {} ms, falling back to {}",
                            timeout_ms, self.default_url
                        );
                        break;
                    }
                    let _ = timeout(remaining.min(Duration::from_millis(250)), self.watch.found.notified()).await;
                }
            }
        }
        Ok(self.base_url())
    }

    /// Poll the URL until it answers with any HTTP response
    async fn wait_for_http(&mut self, url: &str, timeout_duration: Duration) -> bool {
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(2)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Could not build HTTP client for readiness probe: {}", e);
                return false;
            }
        };

        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(url).send().await {
                Ok(resp) => {
                    debug!("Readiness probe answered {} after {} attempt(s)", resp.status(), attempts);
                    return true;
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to accept connections...");
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Readiness probe error: {}", e);
                    }
                }
            }

            if self.ensure_running().is_err() {
                return false;
            }
            sleep(Duration::from_millis(250)).await;
        }

        false
    }

    fn ensure_running(&mut self) -> HarnessResult<()> {
        match self.child.try_wait() {
            Ok(Some(status)) => Err(HarnessError::ServerStartup(format!(
                "server exited before becoming ready ({})",
                status
            ))),
            Ok(None) => Ok(()),
            Err(e) => Err(HarnessError::ServerStartup(format!("cannot poll server process: {}", e))),
        }
    }

    /// Discovered address, or the configured default
    pub fn base_url(&self) -> String {
        self.watch.get().unwrap_or_else(|| self.default_url.clone())
    }

    pub fn discovered_url(&self) -> Option<String> {
        self.watch.get()
    }

    pub fn pid(&self) -> Option<i32> {
        self.pgid
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Terminate the whole process group. Best effort and idempotent.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        info!("Stopping dev server (pgid: {:?})", self.pgid);
        signal_group(self.pgid, false);

        if timeout(self.shutdown_grace, self.child.wait()).await.is_err() {
            debug!("Server did not exit within {:?}, killing", self.shutdown_grace);
        }

        // The leader may be gone while bundler children linger in the group
        signal_group(self.pgid, true);
        let _ = self.child.start_kill();
        let _ = timeout(Duration::from_secs(2), self.child.wait()).await;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            signal_group(self.pgid, true);
            let _ = self.child.start_kill();
        }
    }
}

async fn pump_output<R>(stream: R, source: &'static str, watch: Arc<AddressWatch>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "dev-server", "[{}] {}", source, line);
        if let Some(url) = detect_listen_url(&line) {
            watch.update(url);
        }
    }
}

/// Signal every process in the group. Errors (group already gone) are ignored.
#[cfg(unix)]
fn signal_group(pgid: Option<i32>, force: bool) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid else { return };
    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    if let Err(e) = killpg(Pid::from_raw(pgid), signal) {
        debug!("killpg({}, {}) failed: {}", pgid, signal, e);
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: Option<i32>, _force: bool) {}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("<i> [webpack-dev-server] Loopback: http://localhost:8081/", Some("http://localhost:8081") ; "webpack loopback")]
    #[test_case("Serving \".\" at http://127.0.0.1:8080", Some("http://127.0.0.1:8080") ; "live server")]
    #[test_case("Project is running at HTTP://LOCALHOST:3000", Some("HTTP://LOCALHOST:3000") ; "upper case")]
    #[test_case("On Your Network: http://192.168.1.4:8080", None ; "lan address ignored")]
    #[test_case("compiled successfully", None ; "no address")]
    fn test_detect_listen_url(line: &str, expected: Option<&str>) {
        assert_eq!(detect_listen_url(line).as_deref(), expected);
    }

    #[cfg(unix)]
    fn spec(command: &str, readiness: ReadinessConfig) -> ServerSpec {
        ServerSpec {
            command: command.to_string(),
            working_dir: std::env::temp_dir(),
            env: BTreeMap::new(),
            default_url: "http://localhost:8080".to_string(),
            readiness,
            http_probe: false,
            shutdown_grace: Duration::from_millis(100),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_discovers_address_and_stop_is_idempotent() {
        let spec = spec(
            "echo 'Project is running at http://127.0.0.1:4567/'; sleep 30",
            ReadinessConfig::ScanOutput { timeout_ms: 5_000 },
        );
        let mut server = ServerHandle::start(&spec).unwrap();
        let url = server.await_readiness(&spec.readiness).await.unwrap();
        assert_eq!(url, "http://127.0.0.1:4567");

        server.stop().await;
        assert!(server.is_stopped());
        server.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_on_stderr() {
        let spec = spec(
            "echo 'ready on http://localhost:9911' 1>&2; sleep 30",
            ReadinessConfig::ScanOutput { timeout_ms: 5_000 },
        );
        let mut server = ServerHandle::start(&spec).unwrap();
        let url = server.await_readiness(&spec.readiness).await.unwrap();
        assert_eq!(url, "http://localhost:9911");
        server.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_timeout_falls_back_to_default() {
        let spec = spec("sleep 30", ReadinessConfig::ScanOutput { timeout_ms: 300 });
        let mut server = ServerHandle::start(&spec).unwrap();
        let url = server.await_readiness(&spec.readiness).await.unwrap();
        assert_eq!(url, "http://localhost:8080");
        assert!(server.discovered_url().is_none());
        server.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_is_startup_error() {
        let spec = spec("exit 3", ReadinessConfig::FixedDelay { ms: 300 });
        let mut server = ServerHandle::start(&spec).unwrap();
        let err = server.await_readiness(&spec.readiness).await.unwrap_err();
        assert!(matches!(err, HarnessError::ServerStartup(_)));

        // Stopping an already-dead process is fine
        server.stop().await;
        server.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drop_without_stop_does_not_panic() {
        let spec = spec("sleep 30", ReadinessConfig::FixedDelay { ms: 0 });
        let server = ServerHandle::start(&spec).unwrap();
        assert!(server.pid().is_some());
        drop(server);
    }
}
