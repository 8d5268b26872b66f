//! Element matcher tables
//!
//! Locating controls in an unknown submission is heuristic. Each table is an
//! ordered list of matchers; the first one whose element is visible wins.
//! Tables are plain data so both tiers share them.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::driver::BrowserDriver;
use crate::error::HarnessResult;

/// One way of finding an element. An empty `tag` matches any element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Exact id
    Id(&'static str),
    /// Exact `name` attribute
    Name { tag: &'static str, value: &'static str },
    /// Case-insensitive substring of the placeholder
    Placeholder(&'static str),
    /// Case-insensitive substring of any attribute
    AttrContains { tag: &'static str, attr: &'static str, needle: &'static str },
    /// Element containing the given text
    Text { tag: &'static str, text: &'static str },
    /// Element containing an icon with the given class
    Icon { tag: &'static str, class: &'static str },
    /// Raw selector
    Css(&'static str),
}

impl Matcher {
    /// Render as a Playwright selector
    pub fn to_selector(&self) -> String {
        match self {
            Matcher::Id(id) => format!("#{id}"),
            Matcher::Name { tag, value } => format!(r#"{tag}[name="{value}"]"#),
            Matcher::Placeholder(needle) => format!(r#"[placeholder*="{needle}" i]"#),
            Matcher::AttrContains { tag, attr, needle } => format!(r#"{tag}[{attr}*="{needle}" i]"#),
            Matcher::Text { tag, text } => format!(r#"{tag}:has-text("{text}")"#),
            Matcher::Icon { tag, class } => format!("{tag}:has(.{class})"),
            Matcher::Css(css) => css.to_string(),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_selector())
    }
}

/// Single-line text input for the note title
pub const TITLE_INPUT: &[Matcher] = &[
    Matcher::Id("title"),
    Matcher::Name { tag: "input", value: "title" },
    Matcher::Placeholder("judul"),
    Matcher::Placeholder("title"),
    Matcher::Css(r#"input[type="text"]"#),
];

/// Multi-line input for the note body
pub const BODY_INPUT: &[Matcher] = &[
    Matcher::Id("body"),
    Matcher::Name { tag: "", value: "body" },
    Matcher::Placeholder("isi"),
    Matcher::Placeholder("note"),
    Matcher::Css("textarea"),
];

pub const SUBMIT_CONTROL: &[Matcher] = &[
    Matcher::Css(r#"button[type="submit"]"#),
    Matcher::Css(r#"input[type="submit"]"#),
    Matcher::Css("form button"),
];

pub const ARCHIVE_CONTROL: &[Matcher] = &[
    Matcher::Text { tag: "button", text: "Arsip" },
    Matcher::Text { tag: "button", text: "Archive" },
    Matcher::AttrContains { tag: "button", attr: "class", needle: "archive" },
    Matcher::AttrContains { tag: "button", attr: "id", needle: "archive" },
    Matcher::AttrContains { tag: "button", attr: "aria-label", needle: "archive" },
    Matcher::AttrContains { tag: "button", attr: "aria-label", needle: "arsip" },
    Matcher::Icon { tag: "button", class: "lucide-archive" },
    Matcher::Icon { tag: "button", class: "fa-archive" },
    Matcher::Css(".archive-btn"),
];

pub const UNARCHIVE_CONTROL: &[Matcher] = &[
    Matcher::Text { tag: "button", text: "Batal Arsip" },
    Matcher::Text { tag: "button", text: "Unarchive" },
    Matcher::AttrContains { tag: "button", attr: "class", needle: "unarchive" },
    Matcher::AttrContains { tag: "button", attr: "id", needle: "unarchive" },
    Matcher::AttrContains { tag: "button", attr: "aria-label", needle: "unarchive" },
    Matcher::Icon { tag: "button", class: "lucide-inbox" },
    Matcher::Css(".unarchive-btn"),
];

/// Tab or link leading to the archived notes list
pub const ARCHIVE_TAB: &[Matcher] = &[
    Matcher::Text { tag: "button", text: "Arsip" },
    Matcher::Text { tag: "a", text: "Arsip" },
    Matcher::Text { tag: "button", text: "Archive" },
    Matcher::Text { tag: "a", text: "Archive" },
    Matcher::Css(".tab-archive"),
];

/// Tab or link leading back to the active notes list
pub const HOME_TAB: &[Matcher] = &[
    Matcher::Text { tag: "button", text: "Aktif" },
    Matcher::Text { tag: "a", text: "Aktif" },
    Matcher::Text { tag: "button", text: "Active" },
    Matcher::Text { tag: "a", text: "Active" },
    Matcher::Text { tag: "button", text: "Home" },
    Matcher::Text { tag: "a", text: "Home" },
];

pub const DELETE_CONTROL: &[Matcher] = &[
    Matcher::Text { tag: "button", text: "Hapus" },
    Matcher::Text { tag: "button", text: "Delete" },
    Matcher::AttrContains { tag: "button", attr: "class", needle: "delete" },
    Matcher::AttrContains { tag: "button", attr: "id", needle: "delete" },
    Matcher::AttrContains { tag: "button", attr: "aria-label", needle: "delete" },
    Matcher::AttrContains { tag: "button", attr: "aria-label", needle: "hapus" },
    Matcher::Icon { tag: "button", class: "lucide-trash" },
    Matcher::Icon { tag: "button", class: "fa-trash" },
    Matcher::Css(".delete-btn"),
];

/// Selector of the first visible match in a table
pub async fn first_visible(driver: &dyn BrowserDriver, table: &[Matcher]) -> HarnessResult<Option<String>> {
    for matcher in table {
        let selector = matcher.to_selector();
        if driver.is_visible(&selector).await? {
            debug!("Matched {}", selector);
            return Ok(Some(selector));
        }
    }
    Ok(None)
}

/// Clicks every overlay button that matches `always` or whose trimmed,
/// lower-cased text is one of `texts`. Passed as the argument of
/// [`crate::scripts::SWEEP_OVERLAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlaySweep {
    pub candidates: &'static str,
    pub always: &'static str,
    pub texts: &'static [&'static str],
}

/// Close toasts, alerts and modal dialogs
pub const DISMISS_OVERLAYS: OverlaySweep = OverlaySweep {
    candidates: "button, .swal2-confirm, .swal2-close, .btn-close",
    always: r#".swal2-confirm, .swal2-close, .btn-close, [aria-label*="close" i]"#,
    texts: &["ok", "ya", "tutup"],
};

/// Accept a confirmation prompt
pub const CONFIRM_OVERLAYS: OverlaySweep = OverlaySweep {
    candidates: "button, .swal2-confirm",
    always: ".swal2-confirm",
    texts: &["ok", "ya"],
};

/// Accept a delete confirmation prompt
pub const CONFIRM_DELETE_OVERLAYS: OverlaySweep = OverlaySweep {
    candidates: "button, .swal2-confirm",
    always: ".swal2-confirm",
    texts: &["ok", "ya", "yes", "hapus", "delete"],
};

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Matcher::Id("title"), "#title" ; "id")]
    #[test_case(Matcher::Name { tag: "input", value: "title" }, r#"input[name="title"]"# ; "name with tag")]
    #[test_case(Matcher::Name { tag: "", value: "body" }, r#"[name="body"]"# ; "name any tag")]
    #[test_case(Matcher::Placeholder("judul"), r#"[placeholder*="judul" i]"# ; "placeholder")]
    #[test_case(Matcher::Text { tag: "button", text: "Hapus" }, r#"button:has-text("Hapus")"# ; "text")]
    #[test_case(Matcher::AttrContains { tag: "button", attr: "aria-label", needle: "arsip" }, r#"button[aria-label*="arsip" i]"# ; "attr")]
    #[test_case(Matcher::Icon { tag: "button", class: "fa-trash" }, "button:has(.fa-trash)" ; "icon")]
    fn test_selector_rendering(matcher: Matcher, expected: &str) {
        assert_eq!(matcher.to_selector(), expected);
    }

    #[test]
    fn test_form_tables_prefer_id_then_name_then_placeholder() {
        for table in [TITLE_INPUT, BODY_INPUT] {
            assert!(matches!(table[0], Matcher::Id(_)));
            assert!(matches!(table[1], Matcher::Name { .. }));
            assert!(matches!(table[2], Matcher::Placeholder(_)));
        }
    }

    #[test]
    fn test_unarchive_text_precedes_generic_matchers() {
        assert_eq!(UNARCHIVE_CONTROL[0], Matcher::Text { tag: "button", text: "Batal Arsip" });
    }
}
