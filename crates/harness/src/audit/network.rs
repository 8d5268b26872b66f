//! Checks driven by intercepted API traffic

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use notegrade_common::{ApiCall, Report, RubricItem};

use crate::config::AuditConfig;
use crate::driver::BrowserDriver;
use crate::error::HarnessResult;
use crate::interceptor::NetworkInterceptor;
use crate::scripts;

use super::form::FormControls;

const FAILURE_PROBE_TITLE: &str = "Failure Probe";
const FAILURE_PROBE_BODY: &str = "This request is expected to be rejected.";

/// Lower-cased body markup of the page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMarkup {
    #[serde(default)]
    pub markup: String,
    #[serde(default)]
    pub loading_element: bool,
}

pub async fn page_markup(driver: &dyn BrowserDriver) -> HarnessResult<PageMarkup> {
    let raw = driver.evaluate(scripts::PAGE_MARKUP, Value::Null).await?;
    Ok(serde_json::from_value(raw)?)
}

/// First marker found in the markup, case-insensitive
pub fn find_marker<'m>(markup: &str, markers: &'m [String]) -> Option<&'m str> {
    let markup = markup.to_lowercase();
    markers
        .iter()
        .map(String::as_str)
        .find(|m| !m.is_empty() && markup.contains(&m.to_lowercase()))
}

/// Wait for the first API GET, give the page a moment, then look for a
/// loading state while the request is still held back.
pub async fn probe_loading_indicator(
    driver: &dyn BrowserDriver,
    interceptor: &NetworkInterceptor,
    config: &AuditConfig,
) -> HarnessResult<bool> {
    if tokio::time::timeout(config.loading_wait(), interceptor.first_list_observed())
        .await
        .is_err()
    {
        info!("No API GET within {:?}, no loading state to observe", config.loading_wait());
        return Ok(false);
    }

    driver.pause(config.loading_probe_delay()).await;
    let page = page_markup(driver).await?;

    if page.loading_element {
        info!("Loading indicator element present");
        return Ok(true);
    }
    match find_marker(&page.markup, &config.loading_markers) {
        Some(marker) => {
            info!("Loading state detected via {:?}", marker);
            Ok(true)
        }
        None => {
            debug!("No loading markers while the first GET was pending");
            Ok(false)
        }
    }
}

/// Submit once while the interceptor aborts the create request and look for
/// a native dialog or an error message in the page.
pub async fn check_error_feedback(
    driver: &dyn BrowserDriver,
    config: &AuditConfig,
    interceptor: Option<&NetworkInterceptor>,
    report: &mut Report,
) -> HarnessResult<()> {
    let Some(controls) = FormControls::locate(driver).await? else {
        warn!("Could not locate the note form, error path not exercised");
        report.record_bool(RubricItem::ErrorFeedback, false);
        return Ok(());
    };

    let dialogs_before = driver.dialog_count();
    controls
        .submit(driver, FAILURE_PROBE_TITLE, FAILURE_PROBE_BODY, config.submit_settle())
        .await?;

    if let Some(interceptor) = interceptor {
        if !interceptor.create_failure_injected() {
            warn!("Submission never reached the API, error path not exercised");
            report.record_bool(RubricItem::ErrorFeedback, false);
            return Ok(());
        }
    }

    let dialog_shown = driver.dialog_count() > dialogs_before;
    let feedback = if dialog_shown {
        info!("Failure reported through a native dialog");
        true
    } else {
        let page = page_markup(driver).await?;
        match find_marker(&page.markup, &config.error_markers) {
            Some(marker) => {
                info!("Failure reported in page via {:?}", marker);
                true
            }
            None => {
                warn!("No visible reaction to the failed request");
                false
            }
        }
    };

    report.record_bool(RubricItem::ErrorFeedback, feedback);
    Ok(())
}

/// Grade REST and archive integration from the traffic seen so far
pub fn check_api_traffic(interceptor: Option<&NetworkInterceptor>, report: &mut Report) {
    let stats = interceptor.map(NetworkInterceptor::stats).unwrap_or_default();
    info!(
        "API traffic: GET={} POST={} DELETE={} archive={} unarchive={}",
        stats.get, stats.post, stats.delete, stats.archive, stats.unarchive
    );

    report.record_bool(RubricItem::RestApi, stats.rest_integrated());

    let archived = stats.observed(ApiCall::Archive);
    let unarchived = stats.observed(ApiCall::Unarchive);
    if archived && !unarchived {
        warn!("Archive request seen but no unarchive request");
    }
    report.record_bool(RubricItem::ArchiveUnarchive, archived && unarchived);
}
