//! Builds the list of targets for a batch.
//!
//! Targets come from explicit locators, from list files (one locator per
//! line), from numeric project ids, or from discovering project directories
//! under a local root.

use crate::core::{ResolveError, ScanTarget};
use crate::pipeline::ManifestSet;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names never descended into during discovery.
pub const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "vendor", "target"];

/// Parses a target list.
///
/// Each non-blank line is one locator. Lines starting with `#` are comments.
/// Surrounding whitespace is trimmed.
pub fn parse_target_list(content: &str) -> Vec<ScanTarget> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ScanTarget::parse)
        .collect()
}

/// Reads and parses a target list file.
pub fn read_target_file(path: &Path) -> Result<Vec<ScanTarget>, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let targets = parse_target_list(&content);
    tracing::debug!(path = %path.display(), count = targets.len(), "Read target list");
    Ok(targets)
}

/// Finds every directory under `root` that contains a manifest.
///
/// The walk does not descend into a directory once it is recognised as a
/// project, and skips [`SKIPPED_DIRS`] and hidden directories. Results are
/// sorted by path.
pub fn discover_local_projects(
    root: &Path,
    manifests: &ManifestSet,
) -> Result<Vec<PathBuf>, ResolveError> {
    if !root.is_dir() {
        return Err(ResolveError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut projects = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|source| ResolveError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.depth() > 0 && is_skipped(entry.file_name().to_string_lossy().as_ref()) {
            walker.skip_current_dir();
            continue;
        }
        if let Some(manifest) = manifests.find_in(entry.path()) {
            tracing::debug!(
                path = %entry.path().display(),
                manifest,
                "Discovered project"
            );
            projects.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    Ok(projects)
}

fn is_skipped(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name) || name.starts_with('.')
}

/// Builds local targets from discovered project directories.
pub fn local_targets(paths: &[PathBuf]) -> Vec<ScanTarget> {
    paths
        .iter()
        .map(|p| ScanTarget::local(p.display().to_string()))
        .collect()
}

/// Builds project targets from numeric ids.
pub fn project_targets(ids: &[u64]) -> Vec<ScanTarget> {
    ids.iter().copied().map(ScanTarget::project).collect()
}

/// Removes targets whose identity was already seen, keeping the first.
pub fn dedup_targets(targets: Vec<ScanTarget>) -> Vec<ScanTarget> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(targets.len());
    for target in targets {
        if seen.insert(target.id().to_string()) {
            unique.push(target);
        } else {
            tracing::warn!(scan_target = %target.locator, "Ignoring duplicate target");
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TargetKind;
    use tempfile::TempDir;

    #[test]
    fn test_parse_target_list() {
        let content = "\
# production repos
https://example.com/acme/api.git

   git@example.com:acme/web.git
# 42 is the infra project
42
./local/checkout
";
        let targets = parse_target_list(content);
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[0].kind, TargetKind::Remote);
        assert_eq!(targets[1].locator, "git@example.com:acme/web.git");
        assert_eq!(targets[1].kind, TargetKind::Remote);
        assert_eq!(targets[2].kind, TargetKind::Project(42));
        assert_eq!(targets[3].kind, TargetKind::Local);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_target_list("").is_empty());
        assert!(parse_target_list("\n  \n# nothing\n").is_empty());
    }

    #[test]
    fn test_read_target_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repos.txt");
        std::fs::write(&path, "https://example.com/a.git\nhttps://example.com/b.git\n").unwrap();

        let targets = read_target_file(&path).unwrap();
        assert_eq!(targets.len(), 2);

        let missing = read_target_file(&dir.path().join("nope.txt"));
        assert!(matches!(missing, Err(ResolveError::ReadFile { .. })));
    }

    #[test]
    fn test_discover_local_projects() {
        let root = TempDir::new().unwrap();
        let base = root.path();

        std::fs::create_dir_all(base.join("api")).unwrap();
        std::fs::write(base.join("api/package.json"), "{}").unwrap();
        // Nested inside a project: not reported separately.
        std::fs::create_dir_all(base.join("api/tools/gen")).unwrap();
        std::fs::write(base.join("api/tools/gen/go.mod"), "module gen").unwrap();

        std::fs::create_dir_all(base.join("services/billing")).unwrap();
        std::fs::write(base.join("services/billing/pom.xml"), "<project/>").unwrap();

        std::fs::create_dir_all(base.join("node_modules/left-pad")).unwrap();
        std::fs::write(base.join("node_modules/left-pad/package.json"), "{}").unwrap();

        std::fs::create_dir_all(base.join("docs")).unwrap();
        std::fs::write(base.join("docs/README.md"), "# docs").unwrap();

        let found = discover_local_projects(base, &ManifestSet::default()).unwrap();
        assert_eq!(found, vec![base.join("api"), base.join("services/billing")]);
    }

    #[test]
    fn test_discover_root_is_project() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("requirements.txt"), "flask").unwrap();
        std::fs::create_dir_all(root.path().join("sub")).unwrap();
        std::fs::write(root.path().join("sub/package.json"), "{}").unwrap();

        let found = discover_local_projects(root.path(), &ManifestSet::default()).unwrap();
        assert_eq!(found, vec![root.path().to_path_buf()]);
    }

    #[test]
    fn test_discover_not_a_directory() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        let result = discover_local_projects(&file, &ManifestSet::default());
        assert!(matches!(result, Err(ResolveError::NotADirectory { .. })));
    }

    #[test]
    fn test_dedup_keeps_first() {
        let targets = vec![
            ScanTarget::remote("a"),
            ScanTarget::remote("b"),
            ScanTarget::local("a"),
            ScanTarget::remote("c"),
            ScanTarget::remote("b"),
        ];
        let unique = dedup_targets(targets);
        let locators: Vec<_> = unique.iter().map(|t| t.locator.as_str()).collect();
        assert_eq!(locators, vec!["a", "b", "c"]);
        assert_eq!(unique[0].kind, TargetKind::Remote);
    }

    #[test]
    fn test_target_builders() {
        let projects = project_targets(&[7, 9]);
        assert_eq!(projects[1].kind, TargetKind::Project(9));

        let locals = local_targets(&[PathBuf::from("/srv/app")]);
        assert_eq!(locals[0].locator, "/srv/app");
        assert_eq!(locals[0].kind, TargetKind::Local);
    }

    #[test]
    fn test_dedup_matches_on_locator_only() {
        let unique = dedup_targets(vec![ScanTarget::project(42), ScanTarget::local("42")]);
        assert_eq!(unique, vec![ScanTarget::project(42)]);
    }
}
