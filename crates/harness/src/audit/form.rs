//! Note form: submission round-trip, seeding and validation

use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use notegrade_common::{Report, RubricItem};

use crate::config::AuditConfig;
use crate::driver::BrowserDriver;
use crate::error::HarnessResult;
use crate::matchers::{self, first_visible};
use crate::scripts;

const ECHO_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Resolved selectors of the note form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormControls {
    pub title: String,
    pub body: String,
    pub submit: String,
}

impl FormControls {
    /// Locate the title input, body input and submit control.
    /// `None` if any of them is missing.
    pub async fn locate(driver: &dyn BrowserDriver) -> HarnessResult<Option<Self>> {
        let Some(title) = first_visible(driver, matchers::TITLE_INPUT).await? else {
            debug!("No title input found");
            return Ok(None);
        };
        let Some(body) = first_visible(driver, matchers::BODY_INPUT).await? else {
            debug!("No body input found");
            return Ok(None);
        };
        let Some(submit) = first_visible(driver, matchers::SUBMIT_CONTROL).await? else {
            debug!("No submit control found");
            return Ok(None);
        };
        Ok(Some(Self { title, body, submit }))
    }

    /// Fill both inputs, click submit and wait for the page to settle
    pub async fn submit(
        &self,
        driver: &dyn BrowserDriver,
        title: &str,
        body: &str,
        settle: Duration,
    ) -> HarnessResult<()> {
        driver.fill(&self.title, title).await?;
        driver.fill(&self.body, body).await?;
        driver.click(&self.submit, false).await?;
        driver.pause(settle).await;
        Ok(())
    }
}

/// Marker unique to this run
fn probe_marker(prefix: &str) -> String {
    format!("{} {}", prefix, chrono::Utc::now().timestamp_millis())
}

/// Poll until the text is visible or the timeout elapses. Checks at least once.
pub async fn wait_for_text(driver: &dyn BrowserDriver, text: &str, timeout: Duration) -> HarnessResult<bool> {
    let start = Instant::now();
    loop {
        if driver.text_visible(text).await? {
            return Ok(true);
        }
        if start.elapsed() >= timeout {
            return Ok(false);
        }
        tokio::time::sleep(ECHO_POLL_INTERVAL.min(timeout)).await;
    }
}

/// Submit a unique marker and require it to show up on the page
pub async fn check_submission(driver: &dyn BrowserDriver, config: &AuditConfig, report: &mut Report) -> HarnessResult<()> {
    let Some(controls) = FormControls::locate(driver).await? else {
        warn!("Could not locate the note form");
        report.record_bool(RubricItem::FormSubmission, false);
        return Ok(());
    };

    let marker = probe_marker("Grader Probe");
    info!("Submitting form with marker {:?}", marker);
    controls
        .submit(driver, &marker, &format!("{marker} body"), config.submit_settle())
        .await?;

    let echoed = wait_for_text(driver, &marker, config.echo_timeout()).await?;
    if !echoed {
        warn!("Submitted note did not appear within {:?}", config.echo_timeout());
    }
    report.record_bool(RubricItem::FormSubmission, echoed);
    Ok(())
}

/// Submit an extra note so archive and delete have something to act on
pub async fn seed_target(driver: &dyn BrowserDriver, config: &AuditConfig) -> HarnessResult<()> {
    match FormControls::locate(driver).await? {
        Some(controls) => {
            let title = probe_marker("Target Delete");
            info!("Seeding note {:?}", title);
            controls
                .submit(driver, &title, "Seeded for archive and delete checks.", config.submit_settle())
                .await
        }
        None => {
            warn!("Could not locate the note form, nothing seeded");
            Ok(())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeclaredConstraints {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    minlength: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ValidityState {
    #[serde(default = "default_valid")]
    valid: bool,
    #[serde(default)]
    message: String,
}

fn default_valid() -> bool {
    true
}

/// Validation is present when the input declares a constraint, when a
/// single typed character leaves it invalid, or when it carries a message.
pub fn validation_present(required: bool, minlength: bool, valid_after_typing: bool, message: &str) -> bool {
    required || minlength || !valid_after_typing || !message.is_empty()
}

pub async fn check_validation(driver: &dyn BrowserDriver, report: &mut Report) -> HarnessResult<()> {
    let Some(title) = first_visible(driver, matchers::TITLE_INPUT).await? else {
        warn!("No title input to validate");
        report.record_bool(RubricItem::FormValidation, false);
        return Ok(());
    };

    let declared: DeclaredConstraints =
        serde_json::from_value(driver.evaluate_on(&title, scripts::DECLARED_CONSTRAINTS, Value::Null).await?)
            .unwrap_or_default();

    driver.fill(&title, "").await?;
    driver.type_text(&title, "A").await?;

    let validity: ValidityState =
        serde_json::from_value(driver.evaluate_on(&title, scripts::VALIDITY_STATE, Value::Null).await?)
            .unwrap_or_default();

    debug!(
        "Validation: required={} minlength={} valid={} message={:?}",
        declared.required, declared.minlength, validity.valid, validity.message
    );

    let present = validation_present(declared.required, declared.minlength, validity.valid, &validity.message);
    report.record_bool(RubricItem::FormValidation, present);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(true, false, true, "" => true ; "required attribute")]
    #[test_case(false, true, true, "" => true ; "minlength attribute")]
    #[test_case(false, false, false, "Too short" => true ; "custom validity")]
    #[test_case(false, false, false, "" => true ; "invalid without message")]
    #[test_case(false, false, true, "Judul wajib diisi" => true ; "message only")]
    #[test_case(false, false, true, "" => false ; "no validation")]
    fn test_validation_present(required: bool, minlength: bool, valid: bool, message: &str) -> bool {
        validation_present(required, minlength, valid, message)
    }

    #[test]
    fn test_probe_markers_carry_prefix() {
        let marker = probe_marker("Grader Probe");
        assert!(marker.starts_with("Grader Probe "));
        assert!(marker["Grader Probe ".len()..].parse::<i64>().is_ok());
    }
}
