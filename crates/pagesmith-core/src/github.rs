//! [`RepoHost`] backed by the GitHub REST API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::error::{CoreError, RemoteError, Result};
use crate::remote::{
    CommitRef, HostingAck, NewRepository, RemoteFile, RemoteResult, RepoHandle, RepoHost,
};

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 10;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Deserialize)]
struct RepoPayload {
    name: String,
    owner: OwnerPayload,
    #[serde(default)]
    default_branch: Option<String>,
    html_url: String,
}

impl From<RepoPayload> for RepoHandle {
    fn from(p: RepoPayload) -> Self {
        RepoHandle {
            owner: p.owner.login,
            name: p.name,
            default_branch: p.default_branch.unwrap_or_else(|| "main".to_string()),
            html_url: p.html_url,
        }
    }
}

#[derive(Deserialize)]
struct ContentPayload {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct WritePayload {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct CommitListItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct PagesPayload {
    #[serde(default)]
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    user: String,
    token: String,
}

impl GitHubClient {
    /// Build a client. Fails with [`CoreError::Configuration`] when the user
    /// or token is missing, before any request is attempted.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        if config.user.trim().is_empty() || config.token.trim().is_empty() {
            return Err(CoreError::Configuration(
                "GITHUB_USER and GITHUB_TOKEN must both be set".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pagesmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(&self.token)
    }

    fn contents_path(repo: &RepoHandle, path: &str) -> String {
        format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.name,
            encode_path(path.trim_start_matches('/'))
        )
    }

    async fn write_file(
        &self,
        method: Method,
        repo: &RepoHandle,
        path: &str,
        body: serde_json::Value,
    ) -> RemoteResult<Response> {
        let resp = self
            .request(method, &Self::contents_path(repo, path))
            .json(&body)
            .send()
            .await?;
        check(resp).await
    }

    async fn hosting_call(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> RemoteResult<HostingAck> {
        let mut req = self.request(Method::POST, path);
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(HostingAck { status, body })
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    fn owner(&self) -> &str {
        &self.user
    }

    async fn create_repository(&self, new: &NewRepository) -> RemoteResult<RepoHandle> {
        let body = serde_json::json!({
            "name": new.name,
            "description": new.description,
            "private": new.private,
            "auto_init": new.auto_init,
        });
        let resp = self
            .request(Method::POST, "/user/repos")
            .json(&body)
            .send()
            .await?;
        let payload: RepoPayload = check(resp).await?.json().await?;
        Ok(payload.into())
    }

    async fn get_repository(&self, name: &str) -> RemoteResult<Option<RepoHandle>> {
        let resp = self
            .request(Method::GET, &format!("/repos/{}/{}", self.user, name))
            .send()
            .await?;
        match check(resp).await {
            Ok(r) => Ok(Some(r.json::<RepoPayload>().await?.into())),
            Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_repositories(&self) -> RemoteResult<Vec<RepoHandle>> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let resp = self
                .request(Method::GET, "/user/repos")
                .query(&[
                    ("sort", "updated".to_string()),
                    ("direction", "desc".to_string()),
                    ("affiliation", "owner".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;
            let batch: Vec<RepoPayload> = check(resp).await?.json().await?;
            let last = batch.len() < PER_PAGE;
            all.extend(batch.into_iter().map(RepoHandle::from));
            if last {
                break;
            }
        }
        debug!(count = all.len(), "listed repositories");
        Ok(all)
    }

    async fn read_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        branch: &str,
    ) -> RemoteResult<Option<RemoteFile>> {
        let resp = self
            .request(Method::GET, &Self::contents_path(repo, path))
            .query(&[("ref", branch)])
            .send()
            .await?;
        let payload: ContentPayload = match check(resp).await {
            Ok(r) => r.json().await?,
            Err(RemoteError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(RemoteFile {
            path: payload.path,
            sha: payload.sha,
            content: decode_content(&payload.content)?,
        }))
    }

    async fn create_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        content: &str,
        branch: &str,
    ) -> RemoteResult<CommitRef> {
        let body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": branch,
        });
        let payload: WritePayload = self
            .write_file(Method::PUT, repo, path, body)
            .await?
            .json()
            .await?;
        Ok(payload.commit)
    }

    async fn update_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        content: &str,
        sha: &str,
        branch: &str,
    ) -> RemoteResult<CommitRef> {
        let body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "sha": sha,
            "branch": branch,
        });
        let payload: WritePayload = self
            .write_file(Method::PUT, repo, path, body)
            .await?
            .json()
            .await?;
        Ok(payload.commit)
    }

    async fn delete_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> RemoteResult<()> {
        let body = serde_json::json!({
            "message": message,
            "sha": sha,
            "branch": branch,
        });
        self.write_file(Method::DELETE, repo, path, body).await?;
        Ok(())
    }

    async fn list_commits(&self, repo: &RepoHandle, limit: usize) -> RemoteResult<Vec<CommitRef>> {
        let resp = self
            .request(
                Method::GET,
                &format!("/repos/{}/{}/commits", repo.owner, repo.name),
            )
            .query(&[("per_page", limit.max(1).to_string())])
            .send()
            .await?;
        let items: Vec<CommitListItem> = check(resp).await?.json().await?;
        Ok(items
            .into_iter()
            .take(limit)
            .map(|c| CommitRef {
                sha: c.sha,
                message: c.commit.message,
            })
            .collect())
    }

    async fn enable_hosting(
        &self,
        repo: &RepoHandle,
        branch: &str,
        path: &str,
    ) -> RemoteResult<HostingAck> {
        let body = serde_json::json!({ "source": { "branch": branch, "path": path } });
        self.hosting_call(&format!("/repos/{}/{}/pages", repo.owner, repo.name), Some(body))
            .await
    }

    async fn trigger_hosting_rebuild(&self, repo: &RepoHandle) -> RemoteResult<HostingAck> {
        self.hosting_call(
            &format!("/repos/{}/{}/pages/builds", repo.owner, repo.name),
            None,
        )
        .await
    }

    async fn hosting_status(&self, repo: &RepoHandle) -> RemoteResult<Option<String>> {
        let resp = self
            .request(
                Method::GET,
                &format!("/repos/{}/{}/pages", repo.owner, repo.name),
            )
            .send()
            .await?;
        match check(resp).await {
            Ok(r) => {
                let payload: PagesPayload = r.json().await?;
                Ok(Some(payload.status.unwrap_or_else(|| "unknown".into())))
            }
            Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map non-success responses onto [`RemoteError`]. 409 and 422 on this API
/// mean a missing or stale `sha`, or a name that already exists.
async fn check(resp: Response) -> RemoteResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        404 => RemoteError::NotFound,
        409 | 422 => RemoteError::Conflict(body),
        s => RemoteError::Status { status: s, body },
    })
}

/// GitHub wraps base64 content at 60 columns.
fn decode_content(encoded: &str) -> RemoteResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(format!("base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Decode(format!("utf-8: {e}")))
}

/// Percent-encode a repository path, keeping `/` separators.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for b in path.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
