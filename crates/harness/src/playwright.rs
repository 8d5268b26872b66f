//! Playwright browser automation
//!
//! Drives a single page through a long-lived node process running
//! `bridge.js`. Commands and replies are JSON lines over stdin/stdout.
//! The bridge also pushes events: intercepted requests, which are answered
//! with a [`RouteDecision`] from the [`NetworkInterceptor`], and native
//! dialogs, which it accepts on its own and we only count.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{BrowserConfig, Viewport};
use crate::driver::BrowserDriver;
use crate::error::{HarnessError, HarnessResult};
use crate::interceptor::{NetworkInterceptor, RouteDecision};

const BRIDGE_JS: &str = include_str!("bridge.js");

/// Playwright's own timeout for element actions
const ACTION_TIMEOUT_MS: u64 = 5000;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, String>>>>>;
type SharedStdin = Arc<tokio::sync::Mutex<ChildStdin>>;

/// Commands understood by the bridge
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeOp<'a> {
    Navigate { url: &'a str },
    IsVisible { selector: &'a str },
    TextVisible { text: &'a str },
    Fill { selector: &'a str, value: &'a str, timeout_ms: u64 },
    TypeText { selector: &'a str, text: &'a str, timeout_ms: u64 },
    Click { selector: &'a str, force: bool, timeout_ms: u64 },
    Evaluate { script: &'a str, arg: Value },
    EvaluateOn { selector: &'a str, script: &'a str, arg: Value, timeout_ms: u64 },
    SetViewport { width: u32, height: u32 },
    Route { route: u64, action: &'static str, delay_ms: u64 },
    Close,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(flatten)]
    op: BridgeOp<'a>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BridgeMessage {
    Reply {
        id: u64,
        ok: bool,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        error: Option<String>,
    },
    Event(BridgeEvent),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum BridgeEvent {
    Ready,
    Route { route: u64, method: String, url: String },
    Dialog { kind: String, message: String },
    Fatal { error: String },
}

/// Playwright-backed [`BrowserDriver`]
pub struct PlaywrightDriver {
    child: tokio::sync::Mutex<Child>,
    stdin: SharedStdin,
    pending: Pending,
    next_id: AtomicU64,
    dialogs: Arc<AtomicUsize>,
    command_timeout: Duration,
    navigation_timeout: Duration,
    reader: JoinHandle<()>,
    _workdir: TempDir,
}

impl PlaywrightDriver {
    /// Start the bridge in `project_dir` and wait until the page is open.
    /// With an interceptor every request of the page is routed through it.
    pub async fn launch(
        config: &BrowserConfig,
        project_dir: &Path,
        interceptor: Option<Arc<NetworkInterceptor>>,
    ) -> HarnessResult<Self> {
        Self::check_playwright_installed(project_dir).await?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_JS)?;

        let settings = json!({
            "browser": config.engine.as_str(),
            "headless": config.headless,
            "viewport": config.viewport,
            "intercept": interceptor.is_some(),
            "navigation_timeout_ms": config.navigation_timeout_ms,
        });

        info!(
            "Launching {} ({}) via Playwright bridge",
            config.engine.as_str(),
            if config.headless { "headless" } else { "headed" }
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(project_dir)
            .env("NOTEGRADE_BRIDGE_CONFIG", settings.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::Bridge("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Bridge("bridge stdout unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{}", line);
                }
            });
        }

        let stdin: SharedStdin = Arc::new(tokio::sync::Mutex::new(stdin));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let dialogs = Arc::new(AtomicUsize::new(0));
        let (ready_tx, ready_rx) = oneshot::channel();

        let reader = tokio::spawn(read_messages(
            stdout,
            stdin.clone(),
            pending.clone(),
            dialogs.clone(),
            interceptor,
            ready_tx,
        ));

        let driver = Self {
            child: tokio::sync::Mutex::new(child),
            stdin,
            pending,
            next_id: AtomicU64::new(1),
            dialogs,
            command_timeout: config.command_timeout(),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            reader,
            _workdir: workdir,
        };

        match tokio::time::timeout(driver.navigation_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                debug!("Playwright bridge ready");
                Ok(driver)
            }
            Ok(Ok(Err(e))) => Err(HarnessError::Driver(format!("browser launch failed: {e}"))),
            Ok(Err(_)) => Err(HarnessError::Bridge("bridge exited during startup".into())),
            Err(_) => Err(HarnessError::Timeout("Playwright bridge startup".into())),
        }
    }

    /// Check if Playwright is resolvable from the project directory
    async fn check_playwright_installed(project_dir: &Path) -> HarnessResult<()> {
        let status = TokioCommand::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    async fn request(&self, op: BridgeOp<'_>, timeout: Duration) -> HarnessResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let line = serde_json::to_string(&Envelope { id: Some(id), op })?;
        if let Err(e) = write_line(&self.stdin, &line).await {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(HarnessError::Driver(message)),
            Ok(Err(_)) => Err(HarnessError::Bridge("bridge exited before replying".into())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(HarnessError::Timeout(format!("bridge reply to command {id}")))
            }
        }
    }

    async fn command(&self, op: BridgeOp<'_>) -> HarnessResult<Value> {
        self.request(op, self.command_timeout).await
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        // Navigation waits for network idle, allow it the full navigation timeout plus a margin
        self.request(BridgeOp::Navigate { url }, self.navigation_timeout + self.command_timeout)
            .await
            .map(|_| ())
    }

    async fn is_visible(&self, selector: &str) -> HarnessResult<bool> {
        let value = self.command(BridgeOp::IsVisible { selector }).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn text_visible(&self, text: &str) -> HarnessResult<bool> {
        let value = self.command(BridgeOp::TextVisible { text }).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn fill(&self, selector: &str, value: &str) -> HarnessResult<()> {
        self.command(BridgeOp::Fill { selector, value, timeout_ms: ACTION_TIMEOUT_MS })
            .await
            .map(|_| ())
    }

    async fn type_text(&self, selector: &str, text: &str) -> HarnessResult<()> {
        self.command(BridgeOp::TypeText { selector, text, timeout_ms: ACTION_TIMEOUT_MS })
            .await
            .map(|_| ())
    }

    async fn click(&self, selector: &str, force: bool) -> HarnessResult<()> {
        self.command(BridgeOp::Click { selector, force, timeout_ms: ACTION_TIMEOUT_MS })
            .await
            .map(|_| ())
    }

    async fn evaluate(&self, script: &str, arg: Value) -> HarnessResult<Value> {
        self.command(BridgeOp::Evaluate { script, arg }).await
    }

    async fn evaluate_on(&self, selector: &str, script: &str, arg: Value) -> HarnessResult<Value> {
        self.command(BridgeOp::EvaluateOn { selector, script, arg, timeout_ms: ACTION_TIMEOUT_MS })
            .await
    }

    async fn set_viewport(&self, viewport: Viewport) -> HarnessResult<()> {
        self.command(BridgeOp::SetViewport { width: viewport.width, height: viewport.height })
            .await
            .map(|_| ())
    }

    fn dialog_count(&self) -> usize {
        self.dialogs.load(Ordering::SeqCst)
    }

    async fn close(&self) -> HarnessResult<()> {
        if let Err(e) = self.command(BridgeOp::Close).await {
            debug!("Bridge close command failed: {}", e);
        }

        let mut child = self.child.lock().await;
        match tokio::time::timeout(self.command_timeout, child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright bridge exited with {}", status),
            _ => {
                warn!("Playwright bridge did not exit, killing it");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
        Ok(())
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn write_line(stdin: &SharedStdin, line: &str) -> HarnessResult<()> {
    let mut stdin = stdin.lock().await;
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    Ok(())
}

async fn answer_route(stdin: &SharedStdin, route: u64, decision: RouteDecision) -> HarnessResult<()> {
    let action = match decision {
        RouteDecision::Abort => "abort",
        RouteDecision::Continue | RouteDecision::Delay(_) => "continue",
    };
    let op = BridgeOp::Route {
        route,
        action,
        delay_ms: decision.delay().as_millis() as u64,
    };
    let line = serde_json::to_string(&Envelope { id: None, op })?;
    write_line(stdin, &line).await
}

/// Dispatch bridge output until it closes, then fail whatever is still waiting
async fn read_messages(
    stdout: ChildStdout,
    stdin: SharedStdin,
    pending: Pending,
    dialogs: Arc<AtomicUsize>,
    interceptor: Option<Arc<NetworkInterceptor>>,
    ready_tx: oneshot::Sender<Result<(), String>>,
) {
    let mut ready_tx = Some(ready_tx);
    let mut lines = BufReader::new(stdout).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let message: BridgeMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(_) => {
                debug!(target: "playwright", "{}", line);
                continue;
            }
        };

        match message {
            BridgeMessage::Reply { id, ok, value, error } => {
                if let Some(tx) = pending.lock().remove(&id) {
                    let result = if ok {
                        Ok(value)
                    } else {
                        Err(error.unwrap_or_else(|| "unknown bridge error".to_string()))
                    };
                    let _ = tx.send(result);
                }
            }
            BridgeMessage::Event(BridgeEvent::Ready) => {
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            BridgeMessage::Event(BridgeEvent::Route { route, method, url }) => {
                let decision = interceptor
                    .as_ref()
                    .map(|i| i.on_request(&method, &url))
                    .unwrap_or(RouteDecision::Continue);
                if let Err(e) = answer_route(&stdin, route, decision).await {
                    warn!("Failed to answer route {} {}: {}", method, url, e);
                }
            }
            BridgeMessage::Event(BridgeEvent::Dialog { kind, message }) => {
                dialogs.fetch_add(1, Ordering::SeqCst);
                info!("Native {} dialog accepted: {:?}", kind, message);
            }
            BridgeMessage::Event(BridgeEvent::Fatal { error: e }) => {
                error!("Playwright bridge failure: {}", e);
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Err(e));
                }
            }
        }
    }

    let waiting: Vec<_> = pending.lock().drain().map(|(_, tx)| tx).collect();
    for tx in waiting {
        let _ = tx.send(Err("Playwright bridge exited".to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let line = serde_json::to_value(Envelope {
            id: Some(7),
            op: BridgeOp::Click { selector: "#save", force: true, timeout_ms: 5000 },
        })
        .unwrap();
        assert_eq!(
            line,
            json!({"id": 7, "op": "click", "selector": "#save", "force": true, "timeout_ms": 5000})
        );
    }

    #[test]
    fn test_route_reply_has_no_id() {
        let line = serde_json::to_value(Envelope {
            id: None,
            op: BridgeOp::Route { route: 3, action: "abort", delay_ms: 0 },
        })
        .unwrap();
        assert_eq!(line, json!({"op": "route", "route": 3, "action": "abort", "delay_ms": 0}));
    }

    #[test]
    fn test_parse_reply_and_events() {
        let reply: BridgeMessage = serde_json::from_str(r#"{"id":2,"ok":true,"value":[1,2]}"#).unwrap();
        assert!(matches!(reply, BridgeMessage::Reply { id: 2, ok: true, .. }));

        let failure: BridgeMessage = serde_json::from_str(r#"{"id":4,"ok":false,"error":"boom"}"#).unwrap();
        assert!(matches!(failure, BridgeMessage::Reply { ok: false, error: Some(_), .. }));

        let route: BridgeMessage =
            serde_json::from_str(r#"{"event":"route","route":9,"method":"GET","url":"http://x"}"#).unwrap();
        assert!(matches!(route, BridgeMessage::Event(BridgeEvent::Route { route: 9, .. })));

        let ready: BridgeMessage = serde_json::from_str(r#"{"event":"ready"}"#).unwrap();
        assert!(matches!(ready, BridgeMessage::Event(BridgeEvent::Ready)));
    }

    #[test]
    fn test_bridge_script_handles_every_op() {
        for op in [
            "navigate", "is_visible", "text_visible", "fill", "type_text", "click", "evaluate",
            "evaluate_on", "set_viewport", "route", "close",
        ] {
            assert!(BRIDGE_JS.contains(&format!("{op}:")), "bridge lacks {op}");
        }
    }
}
