//! Browser driver capability
//!
//! The audit engine only talks to the page through this trait. Selectors
//! are strings in the driver's own selector dialect; [`crate::matchers`]
//! renders them. Every locator operation acts on the first match.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::Viewport;
use crate::error::HarnessResult;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a URL and wait for the page to settle
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Whether the first element matching the selector is visible
    async fn is_visible(&self, selector: &str) -> HarnessResult<bool>;

    /// Whether the first element containing the text (substring) is visible
    async fn text_visible(&self, text: &str) -> HarnessResult<bool>;

    async fn fill(&self, selector: &str, value: &str) -> HarnessResult<()>;

    /// Type key by key, firing input events for each character
    async fn type_text(&self, selector: &str, text: &str) -> HarnessResult<()>;

    /// Click; `force` skips actionability checks such as overlays
    async fn click(&self, selector: &str, force: bool) -> HarnessResult<()>;

    /// Evaluate a function expression `(arg) => ...` in the page
    async fn evaluate(&self, script: &str, arg: Value) -> HarnessResult<Value>;

    /// Evaluate a function expression `(el, arg) => ...` on the first match
    async fn evaluate_on(&self, selector: &str, script: &str, arg: Value) -> HarnessResult<Value>;

    async fn set_viewport(&self, viewport: Viewport) -> HarnessResult<()>;

    /// Number of native dialogs shown (and auto-accepted) so far
    fn dialog_count(&self) -> usize;

    async fn close(&self) -> HarnessResult<()>;

    /// Suspend the audit for a settle period
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
