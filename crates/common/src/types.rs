//! Core types shared by the rubric, report and harness

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Grading profile selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Static vanilla-JS app served by a plain file server
    Sub1,
    /// API-integrated app built with a bundler and served by its dev server
    Sub2,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Sub1 => "sub1",
            Tier::Sub2 => "sub2",
        }
    }

    /// Human-readable banner title
    pub fn title(&self) -> &'static str {
        match self {
            Tier::Sub1 => "SUBMISSION 1 (VANILLA JS)",
            Tier::Sub2 => "SUBMISSION 2 (REST API & WEBPACK)",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sub1" | "basic" => Ok(Tier::Sub1),
            "sub2" | "api" => Ok(Tier::Sub2),
            other => Err(Error::UnknownTier(other.to_string())),
        }
    }
}

/// Report section a rubric item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Mandatory,
    Optional,
}

impl Group {
    pub fn heading(&self) -> &'static str {
        match self {
            Group::Mandatory => "MANDATORY CRITERIA",
            Group::Optional => "OPTIONAL SUGGESTIONS",
        }
    }
}

/// Tri-state result of a single check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    #[default]
    Fail,
    /// Passing result carrying a provenance note
    Info(String),
}

impl Outcome {
    pub fn info(detail: impl Into<String>) -> Self {
        Outcome::Info(detail.into())
    }

    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    /// Pass and Info both count as passing
    pub fn is_passing(&self) -> bool {
        !matches!(self, Outcome::Fail)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Info(_) => "INFO",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Outcome::Info(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Classification of a request against the grading API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiCall {
    List,
    Create,
    Delete,
    Archive,
    Unarchive,
}

/// Which kinds of API traffic have been observed during one run.
///
/// Every flag only ever moves from false to true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTrafficStats {
    pub get: bool,
    pub post: bool,
    pub delete: bool,
    pub archive: bool,
    pub unarchive: bool,
}

impl ApiTrafficStats {
    /// Mark a call as observed. Returns true if this was the first observation.
    pub fn mark(&mut self, call: ApiCall) -> bool {
        let flag = match call {
            ApiCall::List => &mut self.get,
            ApiCall::Create => &mut self.post,
            ApiCall::Delete => &mut self.delete,
            ApiCall::Archive => &mut self.archive,
            ApiCall::Unarchive => &mut self.unarchive,
        };
        let first = !*flag;
        *flag = true;
        first
    }

    pub fn observed(&self, call: ApiCall) -> bool {
        match call {
            ApiCall::List => self.get,
            ApiCall::Create => self.post,
            ApiCall::Delete => self.delete,
            ApiCall::Archive => self.archive,
            ApiCall::Unarchive => self.unarchive,
        }
    }

    /// GET, a successful create and DELETE have all been seen
    pub fn rest_integrated(&self) -> bool {
        self.get && self.post && self.delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse() {
        assert_eq!("sub1".parse::<Tier>().unwrap(), Tier::Sub1);
        assert_eq!(" SUB2 ".parse::<Tier>().unwrap(), Tier::Sub2);
        assert!(matches!("sub3".parse::<Tier>(), Err(Error::UnknownTier(_))));
    }

    #[test]
    fn test_stats_are_monotone() {
        let mut stats = ApiTrafficStats::default();
        assert!(stats.mark(ApiCall::Delete));
        assert!(!stats.mark(ApiCall::Delete));
        assert!(stats.delete);
        assert!(stats.observed(ApiCall::Delete));
        assert!(!stats.observed(ApiCall::Archive));
        assert!(!stats.rest_integrated());

        stats.mark(ApiCall::List);
        stats.mark(ApiCall::Create);
        assert!(stats.rest_integrated());
    }

    #[test]
    fn test_outcome_passing() {
        assert!(Outcome::Pass.is_passing());
        assert!(Outcome::info("gsap detected").is_passing());
        assert!(!Outcome::Fail.is_passing());
        assert_eq!(Outcome::info("x").detail(), Some("x"));
    }
}
