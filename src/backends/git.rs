//! Git source fetcher.
//!
//! Clones repositories with the `git` CLI. Hooks and templates are disabled
//! for every clone, and credentials for HTTP(S) remotes are injected into the
//! clone URL only. They never appear in logs or error messages.

use crate::config::GitSettings;
use crate::core::{FetchError, SourceFetcher};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

/// A [`SourceFetcher`] backed by `git clone`.
#[derive(Debug, Clone)]
pub struct GitCliFetcher {
    binary: String,
    depth: u32,
    username: Option<String>,
    token: Option<SecretString>,
}

impl GitCliFetcher {
    /// Creates a fetcher using `git` from `PATH` and a shallow clone.
    pub fn new() -> Self {
        Self {
            binary: "git".to_string(),
            depth: 1,
            username: None,
            token: None,
        }
    }

    /// Creates a fetcher from settings.
    pub fn from_settings(settings: &GitSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            depth: settings.clone_depth,
            username: settings.username.clone(),
            token: settings.token.clone(),
        }
    }

    /// Sets the git binary.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the clone depth. Zero clones the full history.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Sets HTTP(S) credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.token = Some(SecretString::new(token.into().into()));
        self
    }

    /// Returns the URL passed to `git clone`.
    ///
    /// Credentials are added to `http`/`https` URLs when both a username and
    /// a token are configured and the URL carries no credentials of its own.
    fn clone_url(&self, locator: &str) -> Result<String, FetchError> {
        let (Some(username), Some(token)) = (&self.username, &self.token) else {
            return Ok(locator.to_string());
        };

        let mut url = match Url::parse(locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Ok(locator.to_string()),
        };
        if !url.username().is_empty() {
            return Ok(locator.to_string());
        }

        let invalid = || FetchError::InvalidLocator {
            locator: locator.to_string(),
            reason: "cannot carry credentials".to_string(),
        };
        url.set_username(username).map_err(|_| invalid())?;
        url.set_password(Some(token.expose_secret()))
            .map_err(|_| invalid())?;
        Ok(url.into())
    }

    /// Masks the token in git output, both verbatim and in the
    /// percent-encoded form it takes inside the clone URL.
    fn redact(&self, text: &str) -> String {
        let token = match &self.token {
            Some(token) if !token.expose_secret().is_empty() => token.expose_secret(),
            _ => return text.to_string(),
        };
        let mut redacted = text.to_string();
        if let Some(encoded) = encoded_password(token) {
            if encoded != token {
                redacted = redacted.replace(&encoded, "***");
            }
        }
        redacted.replace(token, "***")
    }
}

fn encoded_password(secret: &str) -> Option<String> {
    let mut url = Url::parse("https://user@localhost/").ok()?;
    url.set_password(Some(secret)).ok()?;
    url.password().map(str::to_string)
}

impl Default for GitCliFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for GitCliFetcher {
    fn name(&self) -> &str {
        "git"
    }

    async fn fetch(&self, locator: &str, destination: &Path) -> Result<(), FetchError> {
        if locator.trim().is_empty() || locator.starts_with('-') {
            return Err(FetchError::InvalidLocator {
                locator: locator.to_string(),
                reason: "not a repository URL".to_string(),
            });
        }

        let url = self.clone_url(locator)?;

        let mut cmd = Command::new(&self.binary);
        cmd.env("GIT_TEMPLATE_DIR", "")
            .env("GIT_TERMINAL_PROMPT", "0")
            .args(["-c", "core.hooksPath=/dev/null", "clone", "--quiet"]);
        if self.depth > 0 {
            cmd.arg(format!("--depth={}", self.depth));
        }
        cmd.arg("--")
            .arg(&url)
            .arg(destination)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(
            locator = %locator,
            destination = %destination.display(),
            depth = self.depth,
            "Cloning repository"
        );

        let output = cmd.output().await.map_err(|e| FetchError::ToolNotFound {
            binary: self.binary.clone(),
            reason: e.to_string(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = self.redact(String::from_utf8_lossy(&output.stderr).trim());
        Err(classify_clone_failure(locator, stderr))
    }
}

fn classify_clone_failure(locator: &str, stderr: String) -> FetchError {
    const AUTH_MARKERS: [&str; 4] = [
        "Authentication failed",
        "Permission denied",
        "could not read Username",
        "could not read Password",
    ];
    if AUTH_MARKERS.iter().any(|m| stderr.contains(m)) {
        return FetchError::authentication(locator, stderr);
    }
    if stderr.contains("not found") || stderr.contains("does not exist") {
        return FetchError::not_found(locator);
    }
    FetchError::clone_failed(locator, stderr)
}
