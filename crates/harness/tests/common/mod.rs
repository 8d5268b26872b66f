//! Scripted in-memory page used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use notegrade_common::REQUIRED_NOTES;
use notegrade_harness::config::{AuditConfig, Viewport};
use notegrade_harness::interceptor::{NetworkInterceptor, RouteDecision};
use notegrade_harness::{scripts, BrowserDriver, HarnessError, HarnessResult};

pub const API: &str = "https://notes-api.dicoding.dev/v2/notes";

pub const TITLE: &str = "#title";
pub const BODY: &str = "#body";
pub const SUBMIT: &str = r#"button[type="submit"]"#;

/// How the page reacts to a failed create request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReaction {
    Nothing,
    Dialog,
    Message,
}

#[derive(Debug)]
struct PageState {
    texts: Vec<String>,
    visible: HashSet<String>,
    fields: HashMap<String, String>,
    echo_submissions: bool,
    submit_hits_api: bool,
    failure_reaction: FailureReaction,
    click_requests: HashMap<String, (String, String)>,
    custom_elements: Value,
    display_modes: Vec<String>,
    declared: Value,
    validity: Value,
    overflows_on_mobile: bool,
    markup: String,
    viewport: Viewport,
    clicks: Vec<String>,
}

pub struct FakePage {
    state: Mutex<PageState>,
    interceptor: Option<Arc<NetworkInterceptor>>,
    dialogs: AtomicUsize,
    fail_evaluate: bool,
}

impl FakePage {
    /// A blank page: nothing visible, no behaviour
    pub fn blank() -> Self {
        Self {
            state: Mutex::new(PageState {
                texts: Vec::new(),
                visible: HashSet::new(),
                fields: HashMap::new(),
                echo_submissions: false,
                submit_hits_api: false,
                failure_reaction: FailureReaction::Nothing,
                click_requests: HashMap::new(),
                custom_elements: json!([]),
                display_modes: vec!["block".into(), "inline".into()],
                declared: json!({"required": false, "minlength": false}),
                validity: json!({"valid": true, "message": ""}),
                overflows_on_mobile: false,
                markup: String::new(),
                viewport: Viewport { width: 1280, height: 720 },
                clicks: Vec::new(),
            }),
            interceptor: None,
            dialogs: AtomicUsize::new(0),
            fail_evaluate: false,
        }
    }

    /// A page that behaves like a complete, well-built submission
    pub fn well_built() -> Self {
        Self::blank()
            .with_fixture()
            .with_form(true)
            .with_custom_elements(&[("app-bar", ""), ("note-form", "class"), ("note-item", "class data-id")])
            .with_display_modes(&["block", "grid", "flex"])
            .with_validation(json!({"required": true, "minlength": false}), json!({"valid": false, "message": "Too short"}))
    }

    pub fn with_interceptor(mut self, interceptor: Arc<NetworkInterceptor>) -> Self {
        self.state.lock().submit_hits_api = true;
        self.interceptor = Some(interceptor);
        self
    }

    pub fn with_fixture(self) -> Self {
        {
            let mut state = self.state.lock();
            for note in REQUIRED_NOTES.iter() {
                state.texts.push(note.title.to_string());
                state.texts.push(format!("{} and more", note.body));
            }
        }
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.state.lock().texts.push(text.to_string());
        self
    }

    pub fn without_text(self, text: &str) -> Self {
        self.state.lock().texts.retain(|t| !t.contains(text));
        self
    }

    pub fn with_form(self, echo: bool) -> Self {
        {
            let mut state = self.state.lock();
            state.visible.extend([TITLE.to_string(), BODY.to_string(), SUBMIT.to_string()]);
            state.echo_submissions = echo;
        }
        self
    }

    pub fn with_visible(self, selector: &str) -> Self {
        self.state.lock().visible.insert(selector.to_string());
        self
    }

    /// Clicking the selector issues the request through the interceptor
    pub fn with_click_request(self, selector: &str, method: &str, url: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.visible.insert(selector.to_string());
            state
                .click_requests
                .insert(selector.to_string(), (method.to_string(), url.to_string()));
        }
        self
    }

    pub fn with_failure_reaction(self, reaction: FailureReaction) -> Self {
        self.state.lock().failure_reaction = reaction;
        self
    }

    /// Custom elements as `(tag, space-separated attribute names)`
    pub fn with_custom_elements(self, elements: &[(&str, &str)]) -> Self {
        let list: Vec<Value> = elements
            .iter()
            .map(|(tag, attributes)| {
                let attributes: Vec<&str> = attributes.split_whitespace().collect();
                json!({"tag": tag, "attributes": attributes})
            })
            .collect();
        self.state.lock().custom_elements = Value::Array(list);
        self
    }

    pub fn with_display_modes(self, modes: &[&str]) -> Self {
        self.state.lock().display_modes = modes.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_validation(self, declared: Value, validity: Value) -> Self {
        {
            let mut state = self.state.lock();
            state.declared = declared;
            state.validity = validity;
        }
        self
    }

    pub fn overflowing_on_mobile(self) -> Self {
        self.state.lock().overflows_on_mobile = true;
        self
    }

    pub fn with_markup(self, markup: &str) -> Self {
        self.state.lock().markup = markup.to_lowercase();
        self
    }

    pub fn failing_scripts(mut self) -> Self {
        self.fail_evaluate = true;
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn viewport(&self) -> Viewport {
        self.state.lock().viewport
    }

    fn route(&self, method: &str, url: &str) -> RouteDecision {
        match &self.interceptor {
            Some(interceptor) => interceptor.on_request(method, url),
            None => RouteDecision::Continue,
        }
    }

    fn submit(&self) {
        let decision = if self.state.lock().submit_hits_api {
            self.route("POST", API)
        } else {
            RouteDecision::Continue
        };

        let mut state = self.state.lock();
        if decision == RouteDecision::Abort {
            match state.failure_reaction {
                FailureReaction::Dialog => {
                    self.dialogs.fetch_add(1, Ordering::SeqCst);
                }
                FailureReaction::Message => state.markup.push_str("<p>gagal menyimpan catatan</p>"),
                FailureReaction::Nothing => {}
            }
            return;
        }
        if state.echo_submissions {
            if let Some(title) = state.fields.get(TITLE).cloned() {
                state.texts.push(title);
            }
        }
    }
}

pub fn test_config() -> AuditConfig {
    AuditConfig {
        echo_timeout_ms: 200,
        loading_wait_ms: 500,
        ..AuditConfig::default()
    }
    .without_delays()
}

#[async_trait]
impl BrowserDriver for FakePage {
    async fn navigate(&self, _url: &str) -> HarnessResult<()> {
        if self.interceptor.is_some() {
            self.route("GET", API);
        }
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> HarnessResult<bool> {
        Ok(self.state.lock().visible.contains(selector))
    }

    async fn text_visible(&self, text: &str) -> HarnessResult<bool> {
        Ok(self.state.lock().texts.iter().any(|t| t.contains(text)))
    }

    async fn fill(&self, selector: &str, value: &str) -> HarnessResult<()> {
        self.state.lock().fields.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> HarnessResult<()> {
        self.state
            .lock()
            .fields
            .entry(selector.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn click(&self, selector: &str, _force: bool) -> HarnessResult<()> {
        let request = {
            let mut state = self.state.lock();
            if !state.visible.contains(selector) {
                return Err(HarnessError::Driver(format!("no element matches {selector}")));
            }
            state.clicks.push(selector.to_string());
            state.click_requests.get(selector).cloned()
        };

        if selector == SUBMIT {
            self.submit();
        } else if let Some((method, url)) = request {
            self.route(&method, &url);
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str, _arg: Value) -> HarnessResult<Value> {
        if self.fail_evaluate {
            return Err(HarnessError::Driver("Execution context was destroyed".into()));
        }
        let state = self.state.lock();
        let value = match script {
            s if s == scripts::CUSTOM_ELEMENT_CENSUS => state.custom_elements.clone(),
            s if s == scripts::DISPLAY_MODES => json!(state.display_modes),
            s if s == scripts::PAGE_MARKUP => json!({"markup": state.markup, "loadingElement": false}),
            s if s == scripts::SWEEP_OVERLAYS => json!(0),
            s if s == scripts::HORIZONTAL_OVERFLOW => {
                let inner = state.viewport.width;
                let scroll = if state.overflows_on_mobile && inner < 800 { inner + 240 } else { inner };
                json!({"scrollWidth": scroll, "innerWidth": inner})
            }
            other => return Err(HarnessError::Driver(format!("unexpected script {other}"))),
        };
        Ok(value)
    }

    async fn evaluate_on(&self, selector: &str, script: &str, _arg: Value) -> HarnessResult<Value> {
        let state = self.state.lock();
        if !state.visible.contains(selector) {
            return Err(HarnessError::Driver(format!("no element matches {selector}")));
        }
        match script {
            s if s == scripts::DECLARED_CONSTRAINTS => Ok(state.declared.clone()),
            s if s == scripts::VALIDITY_STATE => Ok(state.validity.clone()),
            other => Err(HarnessError::Driver(format!("unexpected script {other}"))),
        }
    }

    async fn set_viewport(&self, viewport: Viewport) -> HarnessResult<()> {
        self.state.lock().viewport = viewport;
        Ok(())
    }

    fn dialog_count(&self) -> usize {
        self.dialogs.load(Ordering::SeqCst)
    }

    async fn close(&self) -> HarnessResult<()> {
        Ok(())
    }
}
