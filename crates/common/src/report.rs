//! Report aggregation
//!
//! A [`Report`] is built from a tier's rubric schema with every line set to
//! [`Outcome::Fail`]. Checks upgrade lines as evidence comes in; a passing
//! line is never downgraded again within the same run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::rubric::{self, RubricItem};
use crate::types::{Group, Outcome, Tier};

const RULE: &str = "======================================================";

/// A single rubric line and its current outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub item: RubricItem,
    pub group: Group,
    pub label: String,
    pub gating: bool,
    pub outcome: Outcome,
}

impl ReportLine {
    /// Label with the provenance note appended for Info outcomes
    pub fn display_label(&self) -> String {
        match self.outcome.detail() {
            Some(detail) => format!("{} ({})", self.label, detail),
            None => self.label.clone(),
        }
    }
}

/// Aggregated outcomes of one grading run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub tier: Tier,
    pub started_at: DateTime<Utc>,
    lines: Vec<ReportLine>,
}

impl Report {
    /// Create a report with every rubric line of the tier set to Fail
    pub fn for_tier(tier: Tier) -> Self {
        let lines = rubric::schema(tier)
            .iter()
            .map(|entry| ReportLine {
                item: entry.item,
                group: entry.group,
                label: entry.label.to_string(),
                gating: entry.gating,
                outcome: Outcome::Fail,
            })
            .collect();

        Self {
            tier,
            started_at: Utc::now(),
            lines,
        }
    }

    /// Record an outcome for an item.
    ///
    /// Returns true if the stored outcome changed. Items outside the tier's
    /// rubric are ignored, and a passing outcome is never replaced.
    pub fn record(&mut self, item: RubricItem, outcome: Outcome) -> bool {
        let Some(line) = self.lines.iter_mut().find(|l| l.item == item) else {
            debug!(%item, tier = %self.tier, "item not graded in this tier, ignoring");
            return false;
        };

        if line.outcome.is_passing() {
            if line.outcome != outcome {
                debug!(%item, "keeping earlier passing outcome");
            }
            return false;
        }

        if line.outcome == outcome {
            return false;
        }

        line.outcome = outcome;
        true
    }

    /// Shorthand for recording a boolean check result
    pub fn record_bool(&mut self, item: RubricItem, passed: bool) -> bool {
        self.record(item, Outcome::from_bool(passed))
    }

    pub fn outcome(&self, item: RubricItem) -> Option<&Outcome> {
        self.lines.iter().find(|l| l.item == item).map(|l| &l.outcome)
    }

    pub fn passed(&self, item: RubricItem) -> bool {
        self.outcome(item).map(Outcome::is_passing).unwrap_or(false)
    }

    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    /// Lines of one section, in display order
    pub fn group(&self, group: Group) -> impl Iterator<Item = &ReportLine> {
        self.lines.iter().filter(move |l| l.group == group)
    }

    /// Gating lines that are not passing
    pub fn gating_failures(&self) -> Vec<&ReportLine> {
        self.lines
            .iter()
            .filter(|l| l.gating && !l.outcome.is_passing())
            .collect()
    }

    pub fn gates_passed(&self) -> bool {
        self.gating_failures().is_empty()
    }

    /// Number of passing lines out of the total
    pub fn score(&self) -> (usize, usize) {
        let passed = self.lines.iter().filter(|l| l.outcome.is_passing()).count();
        (passed, self.lines.len())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "FINAL AUTOMATED REVIEW SUMMARY ({})", self.tier)?;
        writeln!(f, "{RULE}")?;

        for group in [Group::Mandatory, Group::Optional] {
            writeln!(f)?;
            writeln!(f, "--- {} ---", group.heading())?;
            for line in self.group(group) {
                writeln!(f, " {:<4} | {}", line.outcome.label(), line.display_label())?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "NOTE: Visual aesthetics, animation smoothness, and code plagiarism still require human verification."
        )?;
        write!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_report_is_all_fail() {
        let report = Report::for_tier(Tier::Sub1);
        assert_eq!(report.lines().len(), 7);
        assert!(report.lines().iter().all(|l| l.outcome == Outcome::Fail));
        assert_eq!(report.score(), (0, 7));
    }

    #[test]
    fn test_groups_are_disjoint() {
        for tier in [Tier::Sub1, Tier::Sub2] {
            let report = Report::for_tier(tier);
            let mandatory: HashSet<_> = report.group(Group::Mandatory).map(|l| &l.label).collect();
            let optional: HashSet<_> = report.group(Group::Optional).map(|l| &l.label).collect();
            assert!(mandatory.is_disjoint(&optional));
            assert_eq!(mandatory.len() + optional.len(), report.lines().len());
        }
    }

    #[test]
    fn test_passing_outcome_is_never_downgraded() {
        let mut report = Report::for_tier(Tier::Sub2);
        assert!(report.record(RubricItem::Animation, Outcome::info("gsap detected in package.json")));
        assert!(!report.record(RubricItem::Animation, Outcome::Fail));
        assert!(!report.record(RubricItem::Animation, Outcome::Pass));
        assert_eq!(
            report.outcome(RubricItem::Animation),
            Some(&Outcome::info("gsap detected in package.json"))
        );
    }

    #[test]
    fn test_items_outside_tier_are_ignored() {
        let mut report = Report::for_tier(Tier::Sub2);
        assert!(!report.record(RubricItem::CustomAttributes, Outcome::Pass));
        assert!(report.outcome(RubricItem::CustomAttributes).is_none());
        assert_eq!(report.lines().len(), 11);
    }

    #[test]
    fn test_gating_failures() {
        let mut report = Report::for_tier(Tier::Sub2);
        assert_eq!(report.gating_failures().len(), 2);
        report.record_bool(RubricItem::RestApi, true);
        report.record_bool(RubricItem::Bundler, true);
        assert!(report.gates_passed());

        // sub1 has no gating items, a fully failing report still gates through
        assert!(Report::for_tier(Tier::Sub1).gates_passed());
    }

    #[test]
    fn test_render_order_and_info_detail() {
        let mut report = Report::for_tier(Tier::Sub2);
        report.record(RubricItem::Animation, Outcome::info("@keyframes detected in src/style.css"));
        report.record_bool(RubricItem::FetchApi, true);

        let rendered = report.to_string();
        let mandatory_at = rendered.find("MANDATORY CRITERIA").unwrap();
        let optional_at = rendered.find("OPTIONAL SUGGESTIONS").unwrap();
        assert!(mandatory_at < optional_at);

        let form_at = rendered.find("Criteria 1.1").unwrap();
        let loading_at = rendered.find("Criteria 5").unwrap();
        assert!(form_at < loading_at);

        assert!(rendered.contains(" PASS | Criteria 4: Fetch API Implementation"));
        assert!(rendered.contains(
            " INFO | Suggestion 3: Animation (@keyframes detected in src/style.css)"
        ));
        assert!(rendered.contains(" FAIL | Criteria 2: REST API Integrated"));
    }

    #[test]
    fn test_json_keeps_order() {
        let report = Report::for_tier(Tier::Sub1);
        let json = serde_json::to_value(&report).unwrap();
        let first = &json["lines"][0];
        assert_eq!(first["item"], "render_fixture");
        assert_eq!(first["outcome"]["status"], "fail");
    }
}
