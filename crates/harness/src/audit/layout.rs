//! Layout and mobile viewport checks

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use notegrade_common::{Report, RubricItem};

use crate::config::AuditConfig;
use crate::driver::BrowserDriver;
use crate::error::HarnessResult;
use crate::scripts;

const LAYOUT_MODES: &[&str] = &["grid", "inline-grid", "flex", "inline-flex"];

pub fn uses_flex_or_grid(modes: &[String]) -> bool {
    modes.iter().any(|m| LAYOUT_MODES.contains(&m.trim()))
}

pub async fn check_layout(driver: &dyn BrowserDriver, report: &mut Report) -> HarnessResult<()> {
    let modes: Vec<String> = serde_json::from_value(driver.evaluate(scripts::DISPLAY_MODES, Value::Null).await?)?;
    let passed = uses_flex_or_grid(&modes);
    info!("Display modes in use: {:?}", modes);
    report.record_bool(RubricItem::Layout, passed);
    Ok(())
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Overflow {
    scroll_width: f64,
    inner_width: f64,
}

/// Resize to the mobile viewport, let the page reflow, then look for
/// horizontal overflow.
pub async fn check_viewport(driver: &dyn BrowserDriver, config: &AuditConfig, report: &mut Report) -> HarnessResult<()> {
    driver.set_viewport(config.mobile_viewport).await?;
    driver.pause(config.reflow_settle()).await;

    let overflow: Overflow =
        serde_json::from_value(driver.evaluate(scripts::HORIZONTAL_OVERFLOW, Value::Null).await?)?;
    let fits = overflow.scroll_width <= overflow.inner_width;
    if !fits {
        warn!(
            "Horizontal overflow at {}px: scroll width {}",
            overflow.inner_width, overflow.scroll_width
        );
    }
    report.record_bool(RubricItem::MobileResponsive, fits);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["block", "grid"] => true ; "grid")]
    #[test_case(&["inline-flex"] => true ; "inline flex")]
    #[test_case(&["block", "inline", "none"] => false ; "flow only")]
    #[test_case(&[] => false ; "empty")]
    fn test_uses_flex_or_grid(modes: &[&str]) -> bool {
        let modes: Vec<String> = modes.iter().map(|m| m.to_string()).collect();
        uses_flex_or_grid(&modes)
    }
}
