//! Fixture rendering check

use tracing::{debug, info};

use notegrade_common::{RequiredNote, Report, RubricItem, REQUIRED_NOTES};

use crate::driver::BrowserDriver;
use crate::error::HarnessResult;

/// Number of notes whose title and body are both visible
pub async fn count_visible_notes(driver: &dyn BrowserDriver, notes: &[RequiredNote]) -> HarnessResult<usize> {
    let mut visible = 0;
    for note in notes {
        let title = driver.text_visible(note.title).await?;
        let body = title && driver.text_visible(note.body).await?;
        if title && body {
            visible += 1;
        } else {
            debug!("Note not rendered: {:?} (title visible: {})", note.title, title);
        }
    }
    Ok(visible)
}

pub async fn check_required_notes(driver: &dyn BrowserDriver, report: &mut Report) -> HarnessResult<()> {
    let visible = count_visible_notes(driver, &REQUIRED_NOTES).await?;
    info!("{}/{} required notes rendered", visible, REQUIRED_NOTES.len());
    report.record_bool(RubricItem::RenderFixture, visible == REQUIRED_NOTES.len());
    Ok(())
}
