//! Creating or locating the repository a synchronization call writes to.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::remote::{NewRepository, RepoHandle, RepoHost};
use crate::settle::{Settle, SettlePolicy};
use crate::types::SyncMode;

const REPO_DESCRIPTION: &str = "Auto-generated project for evaluation";

/// `{task}-{YYYYmmddHHMMSS}`; unique across repeated builds of one task.
pub fn repo_name_for(task: &str, at: DateTime<Utc>) -> String {
    format!("{task}-{}", at.format("%Y%m%d%H%M%S"))
}

/// Repository name from the trailing path segment of a repository URL.
/// Returns `None` when nothing usable remains.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    let usable = !name.is_empty()
        && name != trimmed
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    usable.then(|| name.to_string())
}

/// Produce the handle for this call.
///
/// `Create` always makes a new repository and never searches. `Update` tries
/// the URL first and falls back to the most recently updated repository whose
/// name starts with `task`.
pub async fn resolve(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    task: &str,
    mode: SyncMode,
    repo_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RepoHandle> {
    match mode {
        SyncMode::Create => create(host, settle, task, now).await,
        SyncMode::Update => {
            if let Some(name) = repo_url.and_then(repo_name_from_url) {
                match host.get_repository(&name).await {
                    Ok(Some(handle)) => {
                        info!(repo = %handle.name, "resolved repository from url");
                        return Ok(handle);
                    }
                    Ok(None) => {
                        warn!(repo = %name, "repository from url not found, searching by task")
                    }
                    Err(e) => {
                        warn!(repo = %name, error = %e, "repository fetch failed, searching by task")
                    }
                }
            } else {
                warn!(task, "no usable repository url, searching by task");
            }
            find_by_prefix(host, task).await
        }
    }
}

async fn create(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    task: &str,
    now: DateTime<Utc>,
) -> Result<RepoHandle> {
    let name = repo_name_for(task, now);
    let handle = host
        .create_repository(&NewRepository {
            name: name.clone(),
            description: REPO_DESCRIPTION.to_string(),
            private: false,
            auto_init: true,
        })
        .await
        .map_err(|source| CoreError::RepositoryCreate {
            name: name.clone(),
            source,
        })?;
    info!(repo = %handle.name, branch = %handle.default_branch, "created repository");
    settle.pause(Settle::RepoInit).await;
    Ok(handle)
}

/// Most recently updated repository whose name starts with `task`.
pub async fn find_by_prefix(host: &dyn RepoHost, task: &str) -> Result<RepoHandle> {
    let repos = host
        .list_repositories()
        .await
        .map_err(|source| CoreError::RepositoryLookup {
            task: task.to_string(),
            source,
        })?;
    let found = repos
        .into_iter()
        .find(|r| r.name.starts_with(task))
        .ok_or_else(|| CoreError::RepositoryNotFound(task.to_string()))?;
    info!(repo = %found.name, task, "resolved repository by task prefix");
    Ok(found)
}
