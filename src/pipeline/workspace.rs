//! Per-pipeline temporary workspace.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "scanfleet-";

const SOURCE_DIR: &str = "repo";

/// An exclusively owned temporary directory for one pipeline run.
///
/// The directory is removed when the workspace is dropped, including during
/// unwinding. Call [`Workspace::release`] to observe removal errors.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a fresh workspace under the system temp directory, or under
    /// `root` when given.
    pub fn acquire(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(workspace = %dir.path().display(), "Workspace acquired");
        Ok(Self { dir })
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination for fetched source. Does not exist until a fetch creates it.
    pub fn source_dir(&self) -> PathBuf {
        self.dir.path().join(SOURCE_DIR)
    }

    /// Removes the workspace, logging instead of failing if removal fails.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(workspace = %path.display(), "Workspace released"),
            Err(e) => tracing::warn!(
                workspace = %path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_is_removed_on_release() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path())).unwrap();
        let path = ws.path().to_path_buf();

        assert!(path.is_dir());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(WORKSPACE_PREFIX)));
        assert_eq!(ws.source_dir(), path.join("repo"));

        std::fs::write(path.join("marker"), b"x").unwrap();
        ws.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire(Some(root.path())).unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_workspaces_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(Some(root.path())).unwrap();
        let b = Workspace::acquire(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_acquire_fails_for_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        assert!(Workspace::acquire(Some(&missing)).is_err());
    }
}
