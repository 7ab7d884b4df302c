use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};

const USER_AGENT: &str = "api-testgen";

/// Owner and repository name parsed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// Takes the last two path segments after dropping a trailing `.git`.
pub fn extract_repo_details(repo_url: &str) -> Result<RepoRef> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let mut segments = trimmed.rsplit('/');
    match (segments.next(), segments.next()) {
        (Some(name), Some(owner)) if !name.is_empty() && !owner.is_empty() => Ok(RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(AppError::ValidationError(
            "Invalid GitHub repository URL".to_string(),
        )),
    }
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: Option<String>,
}

#[derive(Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

/// Minimal client for the repository contents API.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    branch: String,
}

impl GitHubClient {
    pub fn new(api_base: &str, branch: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            branch: branch.to_string(),
        }
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            repo.owner,
            repo.name,
            path.trim_start_matches('/')
        )
    }

    /// Creates or replaces `path` on the configured branch.
    pub async fn put_file(&self, repo: &RepoRef, token: &str, path: &str, content: &str) -> Result<()> {
        let url = self.contents_url(repo, path);
        let sha = self.existing_sha(&url, token).await;

        let body = PutContentsRequest {
            message: format!("Automated commit of {}", path),
            content: STANDARD.encode(content.as_bytes()),
            branch: &self.branch,
            sha,
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExportError(format!("GitHub request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            info!(owner = %repo.owner, repo = %repo.name, path, "Committed script to GitHub");
            return Ok(());
        }

        let message = response
            .json::<GitHubErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(AppError::ExportError(format!(
            "Failed to export script to GitHub ({}): {}",
            status.as_u16(),
            message
        )))
    }

    /// Sha of the current file, if it exists; lookup failures fall through
    /// to the PUT, which reports the real error.
    async fn existing_sha(&self, url: &str, token: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<ContentsResponse>().await.ok().and_then(|c| c.sha)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "GitHub sha lookup failed");
                None
            }
        }
    }
}
