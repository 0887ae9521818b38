//! Configuration loading.
//!
//! Precedence, lowest to highest: defaults, the YAML config file, the
//! process environment (including values loaded from `.env`), and finally
//! CLI overrides applied by the caller through the `with_*` methods.

use crate::config::settings::{normalize_org, Settings};
use crate::core::ConfigError;

use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys accepted in the YAML config file.
///
/// Keys use the same upper-case names as the environment variables.
/// Lower-case spellings are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSettings {
    /// Snyk API token.
    #[serde(rename = "SNYK_TOKEN", alias = "snyk_token", default)]
    pub snyk_token: Option<String>,

    /// Snyk organization.
    #[serde(rename = "SNYK_ORG", alias = "snyk_org", default)]
    pub snyk_org: Option<String>,

    /// Snyk binary.
    #[serde(rename = "SNYK_BINARY", alias = "snyk_binary", default)]
    pub snyk_binary: Option<String>,

    /// Git username.
    #[serde(rename = "GIT_USERNAME", alias = "git_username", default)]
    pub git_username: Option<String>,

    /// Git token.
    #[serde(rename = "GIT_TOKEN", alias = "git_token", default)]
    pub git_token: Option<String>,

    /// Git password, used when no token is set.
    #[serde(rename = "GIT_PASSWORD", alias = "git_password", default)]
    pub git_password: Option<String>,

    /// Git binary.
    #[serde(rename = "GIT_BINARY", alias = "git_binary", default)]
    pub git_binary: Option<String>,

    /// Clone depth.
    #[serde(rename = "GIT_CLONE_DEPTH", alias = "git_clone_depth", default)]
    pub git_clone_depth: Option<u32>,

    /// GitLab API base URL.
    #[serde(rename = "GITLAB_BASE_URL", alias = "gitlab_base_url", default)]
    pub gitlab_base_url: Option<String>,

    /// GitLab personal access token.
    #[serde(
        rename = "GITLAB_PERSONAL_ACCESS_TOKEN",
        alias = "gitlab_personal_access_token",
        default
    )]
    pub gitlab_personal_access_token: Option<String>,

    /// GitLab token, used when no personal access token is set.
    #[serde(rename = "GITLAB_TOKEN", alias = "gitlab_token", default)]
    pub gitlab_token: Option<String>,

    /// GitLab request timeout in seconds.
    #[serde(rename = "GITLAB_TIMEOUT_SECS", alias = "gitlab_timeout_secs", default)]
    pub gitlab_timeout_secs: Option<u64>,
}

impl FileSettings {
    /// Reads and parses a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content, path)
    }

    fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Returns `~/.config/repo-scanner/config.yaml`, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("repo-scanner").join("config.yaml"))
}

/// Loads `.env` from the working directory without overriding variables
/// that are already set. Returns the path that was loaded.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env file");
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load .env file");
            None
        }
    }
}

impl Settings {
    /// Loads settings from the config file and the process environment.
    ///
    /// An explicit `config_path` must exist. The default path is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => Some(FileSettings::from_file(path)?),
            None => match default_config_path() {
                Some(path) if path.is_file() => Some(FileSettings::from_file(&path)?),
                Some(path) => {
                    tracing::debug!(path = %path.display(), "No config file found, using environment");
                    None
                }
                None => None,
            },
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merges defaults, an optional config file and an environment lookup.
    pub fn from_sources<E>(file: Option<FileSettings>, lookup: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let file_value = |v: &Option<String>| v.clone().filter(|v| !v.trim().is_empty());

        let mut settings = Settings::default();

        if let Some(binary) = env("SNYK_BINARY").or_else(|| file_value(&file.snyk_binary)) {
            settings.snyk.binary = binary;
        }
        settings.snyk.token = env("SNYK_TOKEN")
            .or_else(|| file_value(&file.snyk_token))
            .map(secret);
        settings.snyk.org = env("SNYK_ORG")
            .and_then(normalize_org)
            .or_else(|| file.snyk_org.clone().and_then(normalize_org));

        if let Some(binary) = env("GIT_BINARY").or_else(|| file_value(&file.git_binary)) {
            settings.git.binary = binary;
        }
        settings.git.username = env("GIT_USERNAME").or_else(|| file_value(&file.git_username));
        settings.git.token = env("GIT_TOKEN")
            .or_else(|| env("GIT_PASSWORD"))
            .or_else(|| file_value(&file.git_token))
            .or_else(|| file_value(&file.git_password))
            .map(secret);
        match env("GIT_CLONE_DEPTH") {
            Some(raw) => {
                settings.git.clone_depth =
                    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                        key: "GIT_CLONE_DEPTH".to_string(),
                        reason: format!("'{}' is not a non-negative integer", raw),
                    })?;
            }
            None => {
                if let Some(depth) = file.git_clone_depth {
                    settings.git.clone_depth = depth;
                }
            }
        }

        settings.gitlab.base_url = env("GITLAB_BASE_URL")
            .or_else(|| file_value(&file.gitlab_base_url))
            .map(|url| url.trim_end_matches('/').to_string());
        settings.gitlab.token = env("GITLAB_PERSONAL_ACCESS_TOKEN")
            .or_else(|| env("GITLAB_TOKEN"))
            .or_else(|| file_value(&file.gitlab_personal_access_token))
            .or_else(|| file_value(&file.gitlab_token))
            .map(secret);
        if let Some(secs) = file.gitlab_timeout_secs {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "GITLAB_TIMEOUT_SECS".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            settings.gitlab.timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into())
}
