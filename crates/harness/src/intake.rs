//! Submission intake
//!
//! A submission is either a project directory or a `.zip` archive. Archives
//! are unpacked into a temporary directory that lives as long as the
//! [`Submission`]. Both forms are screened before anything is installed.

use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analysis::PackageManifest;
use crate::error::{HarnessError, HarnessResult};

/// Frameworks a vanilla submission may not depend on
pub const FORBIDDEN_FRAMEWORKS: &[&str] = &["react", "vue", "@angular/core", "nuxt", "next"];

#[derive(Debug)]
pub struct Submission {
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl Submission {
    /// Screen a directory or archive and resolve its project root
    pub fn open(target: &Path) -> HarnessResult<Self> {
        if target.is_dir() {
            let root = target.to_path_buf();
            screen_manifest(&root.join("package.json"))?;
            info!("Using project directory {}", root.display());
            return Ok(Self { root, _extracted: None });
        }

        let is_zip = target
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if !target.is_file() || !is_zip {
            return Err(HarnessError::Setup(format!(
                "{} is neither a directory nor a .zip archive",
                target.display()
            )));
        }

        let extracted = tempfile::Builder::new().prefix("notegrade-").tempdir()?;
        extract_archive(target, extracted.path())?;

        for manifest in WalkDir::new(extracted.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == "package.json")
        {
            screen_manifest(manifest.path())?;
        }

        let root = resolve_root(extracted.path());
        info!("Extracted {} into {}", target.display(), root.display());
        Ok(Self { root, _extracted: Some(extracted) })
    }

    /// Directory commands run in
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reject a manifest depending on a forbidden framework. Unreadable or
/// malformed manifests pass; the static analysis reports them.
fn screen_manifest(path: &Path) -> HarnessResult<()> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Ok(());
    };
    let Ok(manifest) = PackageManifest::parse(&content) else {
        debug!("Ignoring malformed {}", path.display());
        return Ok(());
    };
    match forbidden_framework(&manifest) {
        Some(framework) => Err(HarnessError::Rejected(format!(
            "framework `{framework}` is not allowed ({})",
            path.display()
        ))),
        None => Ok(()),
    }
}

pub fn forbidden_framework(manifest: &PackageManifest) -> Option<&'static str> {
    FORBIDDEN_FRAMEWORKS.iter().copied().find(|f| manifest.declares(f))
}

/// Unpack an archive. Entries that would land outside `dest` are skipped.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> HarnessResult<()> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;

    if archive.file_names().any(|name| name.contains("node_modules/")) {
        return Err(HarnessError::Rejected("archive contains node_modules".into()));
    }
    if !archive.file_names().any(|name| name.to_ascii_lowercase().ends_with(".html")) {
        return Err(HarnessError::Rejected("archive contains no HTML file".into()));
    }

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let out = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&out)?;
        std::io::copy(&mut entry, &mut file)?;
    }

    debug!("Extracted {} entries", archive.len());
    Ok(())
}

/// Shallowest directory holding `package.json` or `index.html`, or `base`
pub fn resolve_root(base: &Path) -> PathBuf {
    WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || (name != "node_modules" && name != "__MACOSX")
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| e.path().join("package.json").is_file() || e.path().join("index.html").is_file())
        .min_by_key(|e| e.depth())
        .map(|e| e.into_path())
        .unwrap_or_else(|| base.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_root_prefers_shallowest() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("project/nested")).unwrap();
        fs::write(dir.path().join("project/package.json"), "{}").unwrap();
        fs::write(dir.path().join("project/nested/index.html"), "").unwrap();
        assert_eq!(resolve_root(dir.path()), dir.path().join("project"));
    }

    #[test]
    fn test_resolve_root_falls_back_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        assert_eq!(resolve_root(dir.path()), dir.path());
    }

    #[test]
    fn test_forbidden_framework_in_dev_dependencies() {
        let m = PackageManifest::parse(r#"{"devDependencies": {"@angular/core": "17"}}"#).unwrap();
        assert_eq!(forbidden_framework(&m), Some("@angular/core"));

        let m = PackageManifest::parse(r#"{"dependencies": {"react-icons": "5"}}"#).unwrap();
        assert_eq!(forbidden_framework(&m), None);
    }

    #[test]
    fn test_directory_with_framework_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"dependencies": {"vue": "3"}}"#).unwrap();
        assert!(matches!(Submission::open(dir.path()), Err(HarnessError::Rejected(_))));
    }

    #[test]
    fn test_other_files_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submission.tar");
        fs::write(&path, "").unwrap();
        assert!(matches!(Submission::open(&path), Err(HarnessError::Setup(_))));
    }
}
