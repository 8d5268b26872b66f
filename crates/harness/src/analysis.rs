//! Static analysis of a submission's manifest and sources

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use notegrade_common::{Outcome, Report, RubricItem};

use crate::error::{HarnessError, HarnessResult};

pub const BUNDLERS: &[&str] = &["webpack", "webpack-dev-server"];

pub const ANIMATION_LIBRARIES: &[&str] = &["animejs", "gsap", "aos", "framer-motion", "motion"];

const PRETTIER_CONFIGS: &[&str] = &[".prettierrc", ".prettierrc.json"];

const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", ".git"];

static ANIMATION_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(transition\s*:|@keyframes|transform\s*:)").expect("valid animation regex"));

/// The parts of `package.json` the harness cares about
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn parse(content: &str) -> HarnessResult<Self> {
        serde_json::from_str(content).map_err(|e| HarnessError::Manifest(format!("malformed package.json: {e}")))
    }

    /// Load `package.json` from a project directory
    pub fn load(dir: &Path) -> HarnessResult<Self> {
        let path = dir.join("package.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| HarnessError::Manifest(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Declared in dependencies or devDependencies
    pub fn declares(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }

    pub fn declares_dev(&self, package: &str) -> bool {
        self.dev_dependencies.contains_key(package)
    }

    pub fn missing_scripts<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|s| !self.scripts.contains_key(s.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Facts gathered without running the submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticFindings {
    pub bundler_declared: bool,
    pub formatter_configured: bool,
    /// Provenance of the animation evidence
    pub animation: Option<String>,
    pub fetch_source: Option<PathBuf>,
}

impl StaticFindings {
    /// Record formatter, animation and fetch outcomes. The bundler item is
    /// left to the caller since it also depends on the build result.
    pub fn record(&self, report: &mut Report) {
        report.record_bool(RubricItem::Formatter, self.formatter_configured);
        if let Some(detail) = &self.animation {
            report.record(RubricItem::Animation, Outcome::info(detail.clone()));
        }
        report.record_bool(RubricItem::FetchApi, self.fetch_source.is_some());
    }
}

pub fn analyze(root: &Path, manifest: &PackageManifest) -> StaticFindings {
    let bundler_declared = BUNDLERS.iter().any(|b| manifest.declares_dev(b));

    let formatter_configured =
        manifest.declares_dev("prettier") && PRETTIER_CONFIGS.iter().any(|f| root.join(f).is_file());

    let animation = ANIMATION_LIBRARIES
        .iter()
        .find(|lib| manifest.declares(lib))
        .map(|lib| format!("{lib} detected in package.json"))
        .or_else(|| {
            find_animation_keyword(root).map(|(keyword, file)| format!("{keyword} detected in {}", file.display()))
        });

    let fetch_source = find_fetch_usage(root);

    let findings = StaticFindings {
        bundler_declared,
        formatter_configured,
        animation,
        fetch_source,
    };
    info!(
        "Static analysis: bundler={} prettier={} animation={:?} fetch={:?}",
        findings.bundler_declared, findings.formatter_configured, findings.animation, findings.fetch_source
    );
    findings
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Source files under `root` with one of the extensions, in a stable order
fn source_files<'a>(root: &'a Path, extensions: &'a [&'a str]) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(move |e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// First CSS/JS/HTML keyword that implies animation, with its file
pub fn find_animation_keyword(root: &Path) -> Option<(String, PathBuf)> {
    for path in source_files(root, &["css", "js", "mjs", "html"]) {
        let Ok(content) = std::fs::read_to_string(&path) else {
            debug!("Skipping unreadable {}", path.display());
            continue;
        };
        if let Some(found) = ANIMATION_KEYWORD.find(&content) {
            let keyword: String = found
                .as_str()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            return Some((keyword, relative(root, &path)));
        }
    }
    None
}

/// First script or page calling `fetch(`
pub fn find_fetch_usage(root: &Path) -> Option<PathBuf> {
    source_files(root, &["js", "mjs", "html"]).find_map(|path| {
        let content = std::fs::read_to_string(&path).ok()?;
        content.contains("fetch(").then(|| relative(root, &path))
    })
}

/// Warn about lifecycle scripts the tier expects
pub fn check_scripts(manifest: &PackageManifest, required: &[String]) {
    let missing = manifest.missing_scripts(required);
    if !missing.is_empty() {
        warn!("package.json is missing script(s): {}", missing.join(", "));
    }
}
