//! GitLab project directory.
//!
//! Resolves numeric project ids through the GitLab REST API
//! (`GET {base}/projects/{id}`). The base URL is expected to include the API
//! prefix, e.g. `https://gitlab.example.com/api/v4`.
//!
//! # Requirements
//!
//! - A personal access token with `read_api` scope
//! - Network access to the GitLab instance

use crate::config::GitLabSettings;
use crate::core::{LookupError, ProjectDirectory, ProjectInfo};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// A [`ProjectDirectory`] backed by the GitLab REST API.
#[derive(Debug)]
pub struct GitLabDirectory {
    base_url: Option<String>,
    token: Option<SecretString>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    name: String,
    #[serde(default)]
    path_with_namespace: Option<String>,
    http_url_to_repo: String,
    #[serde(default)]
    web_url: Option<String>,
}

impl GitLabDirectory {
    /// Creates a directory client from settings.
    ///
    /// Missing URL or token is reported on first lookup, not here.
    pub fn new(settings: &GitLabSettings) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LookupError::Transport {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: settings
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            token: settings.token.clone(),
            client,
        })
    }

    fn project_url(&self, id: u64) -> Result<String, LookupError> {
        let base = self
            .base_url
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                LookupError::not_configured(
                    "GITLAB_BASE_URL is not set (e.g. https://gitlab.example.com/api/v4)",
                )
            })?;
        Ok(format!("{}/projects/{}", base, id))
    }
}

#[async_trait]
impl ProjectDirectory for GitLabDirectory {
    fn name(&self) -> &str {
        "gitlab"
    }

    async fn lookup(&self, id: u64) -> Result<ProjectInfo, LookupError> {
        let url = self.project_url(id)?;
        let token = self
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
            .ok_or_else(|| {
                LookupError::not_configured(
                    "GITLAB_PERSONAL_ACCESS_TOKEN or GITLAB_TOKEN is not set",
                )
            })?;

        tracing::debug!(project_id = id, url = %url, "Looking up GitLab project");

        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", token.expose_secret())
            .send()
            .await
            .map_err(|e| LookupError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound { id });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let project: GitLabProject = response.json().await.map_err(|e| LookupError::Transport {
            message: format!("invalid project response: {}", e),
        })?;

        let display_name = project
            .path_with_namespace
            .filter(|p| !p.is_empty())
            .unwrap_or(project.name);
        let mut info = ProjectInfo::new(id, project.http_url_to_repo, display_name);
        info.web_url = project.web_url;
        Ok(info)
    }
}
