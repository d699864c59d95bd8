//! The remote repository capability consumed by the synchronizer.
//!
//! [`RepoHost`] is deliberately thin: every method maps onto one call of a
//! hosted version-control API. Not-found is a value (`Option`), not an error,
//! so callers never use failure as a control-flow signal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Identifies a remote repository. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoHandle {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub html_url: String,
}

/// Parameters for `create_repository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
    /// Create an initial commit so the default branch exists.
    pub auto_init: bool,
}

/// Content and concurrency token of an existing remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub sha: String,
    pub content: String,
}

/// A commit as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    #[serde(default)]
    pub message: String,
}

/// Raw acknowledgement of a hosting API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingAck {
    pub status: u16,
    pub body: String,
}

impl HostingAck {
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201 | 204)
    }
}

#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Login of the authenticated account that owns created repositories.
    fn owner(&self) -> &str;

    async fn create_repository(&self, new: &NewRepository) -> RemoteResult<RepoHandle>;

    async fn get_repository(&self, name: &str) -> RemoteResult<Option<RepoHandle>>;

    /// Repositories of the authenticated account, most recently updated first.
    async fn list_repositories(&self) -> RemoteResult<Vec<RepoHandle>>;

    async fn read_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        branch: &str,
    ) -> RemoteResult<Option<RemoteFile>>;

    async fn create_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        content: &str,
        branch: &str,
    ) -> RemoteResult<CommitRef>;

    /// Overwrite `path`. Fails with [`RemoteError::Conflict`] when `sha` is stale.
    async fn update_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        content: &str,
        sha: &str,
        branch: &str,
    ) -> RemoteResult<CommitRef>;

    async fn delete_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> RemoteResult<()>;

    /// Most recent commits on the default branch, newest first.
    async fn list_commits(&self, repo: &RepoHandle, limit: usize) -> RemoteResult<Vec<CommitRef>>;

    async fn enable_hosting(
        &self,
        repo: &RepoHandle,
        branch: &str,
        path: &str,
    ) -> RemoteResult<HostingAck>;

    async fn trigger_hosting_rebuild(&self, repo: &RepoHandle) -> RemoteResult<HostingAck>;

    /// Current hosting build status, `None` when hosting is not configured.
    async fn hosting_status(&self, repo: &RepoHandle) -> RemoteResult<Option<String>>;
}
