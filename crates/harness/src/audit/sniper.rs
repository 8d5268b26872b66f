//! Best-effort clicks on archive, unarchive and delete controls
//!
//! Nothing here records an outcome. The clicks only exist to make the app
//! issue the matching API requests, which the interceptor counts.

use tracing::{debug, info, warn};

use crate::config::AuditConfig;
use crate::driver::BrowserDriver;
use crate::error::HarnessResult;
use crate::matchers::{self, first_visible, Matcher, OverlaySweep};
use crate::scripts;

/// Click every overlay button described by the sweep, returns the click count
pub async fn sweep(driver: &dyn BrowserDriver, sweep: &OverlaySweep, config: &AuditConfig) -> HarnessResult<u64> {
    let clicked = driver
        .evaluate(scripts::SWEEP_OVERLAYS, serde_json::to_value(sweep)?)
        .await?
        .as_u64()
        .unwrap_or(0);
    if clicked > 0 {
        debug!("Clicked {} overlay control(s)", clicked);
    }
    driver.pause(config.click_settle()).await;
    Ok(clicked)
}

/// Force-click the first visible control of a table. A failed click is
/// logged and reported as not clicked.
async fn click_first(
    driver: &dyn BrowserDriver,
    table: &[Matcher],
    what: &str,
    config: &AuditConfig,
) -> HarnessResult<bool> {
    let Some(selector) = first_visible(driver, table).await? else {
        debug!("No {} control found", what);
        return Ok(false);
    };

    info!("Clicking {} using {}", what, selector);
    if let Err(e) = driver.click(&selector, true).await {
        warn!("Click on {} failed: {}", what, e);
        return Ok(false);
    }
    driver.pause(config.click_settle()).await;
    Ok(true)
}

pub async fn run(driver: &dyn BrowserDriver, config: &AuditConfig) -> HarnessResult<()> {
    sweep(driver, &matchers::DISMISS_OVERLAYS, config).await?;

    if click_first(driver, matchers::ARCHIVE_CONTROL, "archive", config).await? {
        sweep(driver, &matchers::CONFIRM_OVERLAYS, config).await?;
    }

    // The archived note may only be reachable from the archive list
    let mut unarchived = click_first(driver, matchers::UNARCHIVE_CONTROL, "unarchive", config).await?;
    if !unarchived && click_first(driver, matchers::ARCHIVE_TAB, "archive tab", config).await? {
        unarchived = click_first(driver, matchers::UNARCHIVE_CONTROL, "unarchive", config).await?;
    }
    if unarchived {
        sweep(driver, &matchers::CONFIRM_OVERLAYS, config).await?;
    }

    click_first(driver, matchers::HOME_TAB, "home tab", config).await?;

    if click_first(driver, matchers::DELETE_CONTROL, "delete", config).await? {
        sweep(driver, &matchers::CONFIRM_DELETE_OVERLAYS, config).await?;
    }
    Ok(())
}
