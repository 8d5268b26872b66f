//! Network interception for the grading API
//!
//! The browser driver reports every outgoing request and applies the
//! returned [`RouteDecision`]. Requests that do not target the API path pass
//! through untouched. For API requests:
//!
//! - the first GET is delayed so the page has time to show a loading state
//! - the first create POST is aborted to exercise the error path; later
//!   ones are let through and counted
//! - DELETE, archive and unarchive calls are counted
//!
//! This type is the only writer of [`ApiTrafficStats`].

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

use notegrade_common::{ApiCall, ApiTrafficStats};

use crate::config::AuditConfig;

/// What the driver should do with an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Continue,
    /// Fail the request as a network error
    Abort,
    /// Hold the request, then let it through
    Delay(Duration),
}

impl RouteDecision {
    pub fn delay(&self) -> Duration {
        match self {
            RouteDecision::Delay(d) => *d,
            _ => Duration::ZERO,
        }
    }
}

pub struct NetworkInterceptor {
    api_path: String,
    first_get_delay: Duration,
    stats: Mutex<ApiTrafficStats>,
    create_failure_injected: AtomicBool,
    first_list: Notify,
}

impl NetworkInterceptor {
    pub fn new(api_path: impl Into<String>, first_get_delay: Duration) -> Self {
        Self {
            api_path: api_path.into(),
            first_get_delay,
            stats: Mutex::new(ApiTrafficStats::default()),
            create_failure_injected: AtomicBool::new(false),
            first_list: Notify::new(),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.api_path.clone(), config.first_get_delay())
    }

    /// Classify a request against the API, `None` if it is not an API call
    pub fn classify(&self, method: &str, url: &str) -> Option<ApiCall> {
        if !url.contains(&self.api_path) {
            return None;
        }

        let method = method.to_ascii_uppercase();
        match method.as_str() {
            "GET" => Some(ApiCall::List),
            "DELETE" => Some(ApiCall::Delete),
            "POST" if url.contains("unarchive") => Some(ApiCall::Unarchive),
            "POST" if url.contains("archive") => Some(ApiCall::Archive),
            "POST" => Some(ApiCall::Create),
            _ => None,
        }
    }

    /// Decide the fate of one outgoing request
    pub fn on_request(&self, method: &str, url: &str) -> RouteDecision {
        let Some(call) = self.classify(method, url) else {
            return RouteDecision::Continue;
        };

        match call {
            ApiCall::List => {
                if self.stats.lock().mark(ApiCall::List) {
                    info!("First API GET observed, delaying it by {:?}", self.first_get_delay);
                    self.first_list.notify_one();
                    return RouteDecision::Delay(self.first_get_delay);
                }
                RouteDecision::Continue
            }
            ApiCall::Create => {
                if !self.create_failure_injected.swap(true, Ordering::SeqCst) {
                    info!("Aborting first API POST to exercise error handling");
                    return RouteDecision::Abort;
                }
                if self.stats.lock().mark(ApiCall::Create) {
                    info!("API POST observed");
                }
                RouteDecision::Continue
            }
            other => {
                if self.stats.lock().mark(other) {
                    info!("API {:?} observed", other);
                } else {
                    debug!("API {:?} observed again", other);
                }
                RouteDecision::Continue
            }
        }
    }

    /// Snapshot of the traffic seen so far
    pub fn stats(&self) -> ApiTrafficStats {
        *self.stats.lock()
    }

    pub fn create_failure_injected(&self) -> bool {
        self.create_failure_injected.load(Ordering::SeqCst)
    }

    /// Resolves once the first API GET has been intercepted
    pub async fn first_list_observed(&self) {
        if self.stats.lock().get {
            return;
        }
        self.first_list.notified().await;
    }
}
