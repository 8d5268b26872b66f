//! Fixed rubric schemas for the two submission tiers
//!
//! Each tier lists the items it grades, in display order. The order encodes
//! the rubric numbering and is what the report prints.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Group, Tier};

/// Every check the harness is able to report on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricItem {
    RenderFixture,
    FormSubmission,
    Layout,
    WebComponents,
    FormValidation,
    CustomAttributes,
    MobileResponsive,
    RestApi,
    Bundler,
    FetchApi,
    LoadingIndicator,
    ArchiveUnarchive,
    ErrorFeedback,
    Animation,
    Formatter,
}

impl RubricItem {
    pub fn as_str(&self) -> &'static str {
        match self {
            RubricItem::RenderFixture => "render_fixture",
            RubricItem::FormSubmission => "form_submission",
            RubricItem::Layout => "layout",
            RubricItem::WebComponents => "web_components",
            RubricItem::FormValidation => "form_validation",
            RubricItem::CustomAttributes => "custom_attributes",
            RubricItem::MobileResponsive => "mobile_responsive",
            RubricItem::RestApi => "rest_api",
            RubricItem::Bundler => "bundler",
            RubricItem::FetchApi => "fetch_api",
            RubricItem::LoadingIndicator => "loading_indicator",
            RubricItem::ArchiveUnarchive => "archive_unarchive",
            RubricItem::ErrorFeedback => "error_feedback",
            RubricItem::Animation => "animation",
            RubricItem::Formatter => "formatter",
        }
    }
}

impl fmt::Display for RubricItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a tier's rubric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubricEntry {
    pub item: RubricItem,
    pub group: Group,
    pub label: &'static str,
    /// A failing gating item makes the whole run exit non-zero
    pub gating: bool,
}

const fn mandatory(item: RubricItem, label: &'static str, gating: bool) -> RubricEntry {
    RubricEntry { item, group: Group::Mandatory, label, gating }
}

const fn optional(item: RubricItem, label: &'static str) -> RubricEntry {
    RubricEntry { item, group: Group::Optional, label, gating: false }
}

const SUB1: &[RubricEntry] = &[
    mandatory(RubricItem::RenderFixture, "Criteria 1: Render 15 Notes (Title & Body)", false),
    mandatory(RubricItem::FormSubmission, "Criteria 2: Add Note Form Functionality", false),
    mandatory(RubricItem::Layout, "Criteria 3: CSS Grid / Flexbox Layout Detected", false),
    mandatory(RubricItem::WebComponents, "Criteria 4: Web Components (Min 3)", false),
    optional(RubricItem::FormValidation, "Suggestion 2: Realtime Form Validation"),
    optional(RubricItem::CustomAttributes, "Suggestion 3: Custom Attributes on Web Components"),
    optional(RubricItem::MobileResponsive, "Suggestion 4: Mobile Responsiveness (No Overflow)"),
];

const SUB2: &[RubricEntry] = &[
    mandatory(RubricItem::FormSubmission, "Criteria 1.1: Inherited Sub 1 Form Functionality", false),
    mandatory(RubricItem::WebComponents, "Criteria 1.2: Inherited Sub 1 Web Components (Min 3)", false),
    mandatory(RubricItem::Layout, "Criteria 1.3: Inherited Sub 1 CSS Grid / Flexbox", false),
    mandatory(RubricItem::RestApi, "Criteria 2: REST API Integrated (GET, POST, DELETE)", true),
    mandatory(RubricItem::Bundler, "Criteria 3: Webpack Bundler & Dev Server Configured", true),
    mandatory(RubricItem::FetchApi, "Criteria 4: Fetch API Implementation", false),
    mandatory(RubricItem::LoadingIndicator, "Criteria 5: Loading Indicator Rendered", false),
    optional(RubricItem::ArchiveUnarchive, "Suggestion 1: Archive & Unarchive Implementation"),
    optional(RubricItem::ErrorFeedback, "Suggestion 2: Error Feedback Handled"),
    optional(RubricItem::Animation, "Suggestion 3: Animation"),
    optional(RubricItem::Formatter, "Suggestion 4: Prettier Formatter Configured"),
];

/// Rubric schema for a tier, in display order
pub fn schema(tier: Tier) -> &'static [RubricEntry] {
    match tier {
        Tier::Sub1 => SUB1,
        Tier::Sub2 => SUB2,
    }
}

/// Look up a single entry of a tier's schema
pub fn entry(tier: Tier, item: RubricItem) -> Option<&'static RubricEntry> {
    schema(tier).iter().find(|e| e.item == item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test_case(Tier::Sub1, 4, 3 ; "sub1")]
    #[test_case(Tier::Sub2, 7, 4 ; "sub2")]
    fn test_schema_shape(tier: Tier, mandatory: usize, optional: usize) {
        let entries = schema(tier);
        let m = entries.iter().filter(|e| e.group == Group::Mandatory).count();
        let o = entries.iter().filter(|e| e.group == Group::Optional).count();
        assert_eq!((m, o), (mandatory, optional));

        let items: HashSet<_> = entries.iter().map(|e| e.item).collect();
        assert_eq!(items.len(), entries.len(), "items must be unique within a tier");

        let labels: HashSet<_> = entries.iter().map(|e| e.label).collect();
        assert_eq!(labels.len(), entries.len(), "labels must be unique within a tier");
    }

    #[test]
    fn test_gating_items() {
        let gating: Vec<_> = schema(Tier::Sub2)
            .iter()
            .filter(|e| e.gating)
            .map(|e| e.item)
            .collect();
        assert_eq!(gating, vec![RubricItem::RestApi, RubricItem::Bundler]);
        assert!(schema(Tier::Sub1).iter().all(|e| !e.gating));
    }

    #[test]
    fn test_entry_lookup() {
        assert!(entry(Tier::Sub1, RubricItem::RenderFixture).is_some());
        assert!(entry(Tier::Sub2, RubricItem::RenderFixture).is_none());
        assert!(entry(Tier::Sub1, RubricItem::RestApi).is_none());
    }
}
