//! Project manifest detection.

use std::path::Path;

/// Manifest file names recognised by default.
pub const DEFAULT_MANIFESTS: &[&str] = &[
    "go.mod",
    "package.json",
    "requirements.txt",
    "Pipfile",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.toml",
];

/// A set of file names that mark a directory as a scannable project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSet {
    names: Vec<String>,
}

impl ManifestSet {
    /// Creates a set from explicit names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a name to the set.
    pub fn with_manifest(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    /// Returns the recognised names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the first manifest present directly in `dir`.
    pub fn find_in(&self, dir: &Path) -> Option<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .find(|name| dir.join(name).is_file())
    }

    /// Returns `true` if `dir` directly contains any manifest.
    pub fn contains_manifest(&self, dir: &Path) -> bool {
        self.find_in(dir).is_some()
    }

    /// Comma-separated list for error messages.
    pub fn describe(&self) -> String {
        self.names.join(", ")
    }
}

impl Default for ManifestSet {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFESTS.iter().copied())
    }
}
