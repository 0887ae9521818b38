//! Immutable runtime settings.

use secrecy::SecretString;
use std::time::Duration;

/// Default scanner binary.
pub const DEFAULT_SNYK_BINARY: &str = "snyk";

/// Default git binary.
pub const DEFAULT_GIT_BINARY: &str = "git";

/// Default clone depth. Zero means a full clone.
pub const DEFAULT_CLONE_DEPTH: u32 = 1;

/// Settings for the Snyk CLI.
#[derive(Debug, Clone)]
pub struct SnykSettings {
    /// Path or name of the `snyk` binary.
    pub binary: String,

    /// API token passed to the CLI as `SNYK_TOKEN`.
    pub token: Option<SecretString>,

    /// Organization passed as `--org=<org>`.
    pub org: Option<String>,
}

impl Default for SnykSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_SNYK_BINARY.to_string(),
            token: None,
            org: None,
        }
    }
}

/// Settings for cloning over git.
#[derive(Debug, Clone)]
pub struct GitSettings {
    /// Path or name of the `git` binary.
    pub binary: String,

    /// Username for HTTP(S) clones.
    pub username: Option<String>,

    /// Token or password for HTTP(S) clones.
    pub token: Option<SecretString>,

    /// `--depth` for clones; 0 clones the full history.
    pub clone_depth: u32,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_GIT_BINARY.to_string(),
            username: None,
            token: None,
            clone_depth: DEFAULT_CLONE_DEPTH,
        }
    }
}

/// Settings for the GitLab project directory.
#[derive(Debug, Clone)]
pub struct GitLabSettings {
    /// API base URL, e.g. `https://gitlab.example.com/api/v4`.
    pub base_url: Option<String>,

    /// Personal access token sent as `PRIVATE-TOKEN`.
    pub token: Option<SecretString>,

    /// Request timeout.
    pub timeout: Duration,
}

impl Default for GitLabSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// All settings, built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Scanner settings.
    pub snyk: SnykSettings,
    /// Git settings.
    pub git: GitSettings,
    /// GitLab settings.
    pub gitlab: GitLabSettings,
}

impl Settings {
    /// Creates settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the Snyk organization. `None` keeps the current value.
    pub fn with_snyk_org(mut self, org: Option<String>) -> Self {
        if let Some(org) = org.and_then(normalize_org) {
            self.snyk.org = Some(org);
        }
        self
    }

    /// Sets the Snyk token.
    pub fn with_snyk_token(mut self, token: impl Into<String>) -> Self {
        self.snyk.token = Some(SecretString::new(token.into().into()));
        self
    }

    /// Sets the Snyk binary.
    pub fn with_snyk_binary(mut self, binary: impl Into<String>) -> Self {
        self.snyk.binary = binary.into();
        self
    }

    /// Overrides the clone depth. `None` keeps the current value.
    pub fn with_clone_depth(mut self, depth: Option<u32>) -> Self {
        if let Some(depth) = depth {
            self.git.clone_depth = depth;
        }
        self
    }

    /// Sets git credentials for HTTP(S) clones.
    pub fn with_git_credentials(
        mut self,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.git.username = Some(username.into());
        self.git.token = Some(SecretString::new(token.into().into()));
        self
    }

    /// Sets the GitLab API base URL and token.
    pub fn with_gitlab(mut self, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        self.gitlab.base_url = Some(base_url.into());
        self.gitlab.token = Some(SecretString::new(token.into().into()));
        self
    }
}

/// Drops empty organization values and the literal `"true"`, which shows up
/// when a boolean flag is mistaken for the org option.
pub(crate) fn normalize_org(org: String) -> Option<String> {
    let org = org.trim();
    if org.is_empty() || org.eq_ignore_ascii_case("true") {
        None
    } else {
        Some(org.to_string())
    }
}
