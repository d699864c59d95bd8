//! In-process [`RepoHost`] with fault injection and a call log.
//!
//! Used by the test suites and by `pagesmith serve --offline`. Tokens are
//! content hashes, so a write with an outdated token is rejected exactly as
//! the hosted API would reject it.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::RemoteError;
use crate::remote::{
    CommitRef, HostingAck, NewRepository, RemoteFile, RemoteResult, RepoHandle, RepoHost,
};

/// One call made against a [`MemoryHost`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateRepository(String),
    GetRepository(String),
    ListRepositories,
    ReadFile(String),
    CreateFile(String),
    UpdateFile(String),
    DeleteFile(String),
    ListCommits,
    EnableHosting { branch: String, path: String },
    TriggerRebuild,
    HostingStatus,
}

impl HostCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            HostCall::CreateFile(_) | HostCall::UpdateFile(_) | HostCall::DeleteFile(_)
        )
    }

    pub fn is_hosting(&self) -> bool {
        matches!(self, HostCall::EnableHosting { .. } | HostCall::TriggerRebuild)
    }
}

#[derive(Default)]
struct Faults {
    reject_updates: HashSet<String>,
    reject_creates: HashSet<String>,
    reject_deletes: HashSet<String>,
    fail_reads: HashSet<String>,
    stale_after_read: HashSet<String>,
    fail_repo_creation: bool,
    fail_repo_fetch: bool,
    fail_listing: bool,
    fail_commits: bool,
    fail_hosting: bool,
    hosting_status: Option<u16>,
}

struct StoredFile {
    content: String,
    sha: String,
}

struct MemoryRepo {
    handle: RepoHandle,
    files: BTreeMap<String, StoredFile>,
    commits: Vec<CommitRef>,
    updated: u64,
    hosting: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    repos: BTreeMap<String, MemoryRepo>,
    clock: u64,
    calls: Vec<HostCall>,
    faults: Faults,
}

impl MemoryState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn repo_mut(&mut self, name: &str) -> RemoteResult<&mut MemoryRepo> {
        self.repos.get_mut(name).ok_or(RemoteError::NotFound)
    }

    fn commit(&mut self, repo: &str, message: String) -> RemoteResult<CommitRef> {
        let now = self.tick();
        let r = self.repo_mut(repo)?;
        let commit = CommitRef {
            sha: hash(&format!("{}:{}:{}", r.handle.name, r.commits.len(), now)),
            message,
        };
        r.commits.push(commit.clone());
        r.updated = now;
        Ok(commit)
    }
}

fn hash(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

fn blob_sha(path: &str, content: &str) -> String {
    hash(&format!("{path}\0{content}"))
}

pub struct MemoryHost {
    owner: String,
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Seed an existing repository with hosting already enabled.
    pub fn seed_repository(&self, name: &str, files: &[(&str, &str)]) -> RepoHandle {
        let handle = self.handle_for(name);
        let mut st = self.state();
        let now = st.tick();
        let mut stored = BTreeMap::new();
        for (path, content) in files {
            stored.insert(
                path.to_string(),
                StoredFile {
                    content: content.to_string(),
                    sha: blob_sha(path, content),
                },
            );
        }
        st.repos.insert(
            name.to_string(),
            MemoryRepo {
                handle: handle.clone(),
                files: stored,
                commits: vec![CommitRef {
                    sha: hash(&format!("{name}:seed")),
                    message: "Initial commit".into(),
                }],
                updated: now,
                hosting: Some("built".into()),
            },
        );
        handle
    }

    fn handle_for(&self, name: &str) -> RepoHandle {
        RepoHandle {
            owner: self.owner.clone(),
            name: name.to_string(),
            default_branch: "main".into(),
            html_url: format!("https://github.com/{}/{}", self.owner, name),
        }
    }

    // -- fault injection ---------------------------------------------------

    /// Every update of `path` is rejected as a conflict.
    pub fn reject_updates(&self, path: &str) {
        self.state().faults.reject_updates.insert(path.to_string());
    }

    pub fn reject_creates(&self, path: &str) {
        self.state().faults.reject_creates.insert(path.to_string());
    }

    pub fn reject_deletes(&self, path: &str) {
        self.state().faults.reject_deletes.insert(path.to_string());
    }

    pub fn fail_reads(&self, path: &str) {
        self.state().faults.fail_reads.insert(path.to_string());
    }

    /// The next read of `path` returns a token that an external writer
    /// immediately invalidates.
    pub fn stale_after_next_read(&self, path: &str) {
        self.state().faults.stale_after_read.insert(path.to_string());
    }

    pub fn fail_repository_creation(&self) {
        self.state().faults.fail_repo_creation = true;
    }

    pub fn fail_repository_fetch(&self) {
        self.state().faults.fail_repo_fetch = true;
    }

    pub fn fail_listing(&self) {
        self.state().faults.fail_listing = true;
    }

    pub fn fail_commit_listing(&self) {
        self.state().faults.fail_commits = true;
    }

    pub fn fail_hosting(&self) {
        self.state().faults.fail_hosting = true;
    }

    /// Force every hosting call to answer with `status`.
    pub fn hosting_responds_with(&self, status: u16) {
        self.state().faults.hosting_status = Some(status);
    }

    // -- inspection --------------------------------------------------------

    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn file(&self, repo: &str, path: &str) -> Option<String> {
        self.state()
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| f.content.clone())
    }

    pub fn files(&self, repo: &str) -> BTreeMap<String, String> {
        self.state()
            .repos
            .get(repo)
            .map(|r| {
                r.files
                    .iter()
                    .map(|(k, v)| (k.clone(), v.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn repository_names(&self) -> Vec<String> {
        self.state().repos.keys().cloned().collect()
    }

    pub fn hosting(&self, repo: &str) -> Option<String> {
        self.state().repos.get(repo).and_then(|r| r.hosting.clone())
    }

    pub fn commit_count(&self, repo: &str) -> usize {
        self.state()
            .repos
            .get(repo)
            .map(|r| r.commits.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RepoHost for MemoryHost {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, new: &NewRepository) -> RemoteResult<RepoHandle> {
        let handle = self.handle_for(&new.name);
        let mut st = self.state();
        st.calls.push(HostCall::CreateRepository(new.name.clone()));
        if st.faults.fail_repo_creation {
            return Err(RemoteError::Status {
                status: 500,
                body: "repository creation failed".into(),
            });
        }
        if st.repos.contains_key(&new.name) {
            return Err(RemoteError::Conflict("name already exists on this account".into()));
        }
        let now = st.tick();
        st.repos.insert(
            new.name.clone(),
            MemoryRepo {
                handle: handle.clone(),
                files: BTreeMap::new(),
                commits: Vec::new(),
                updated: now,
                hosting: None,
            },
        );
        if new.auto_init {
            st.commit(&new.name, "Initial commit".into())?;
        }
        Ok(handle)
    }

    async fn get_repository(&self, name: &str) -> RemoteResult<Option<RepoHandle>> {
        let mut st = self.state();
        st.calls.push(HostCall::GetRepository(name.to_string()));
        if st.faults.fail_repo_fetch {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        Ok(st.repos.get(name).map(|r| r.handle.clone()))
    }

    async fn list_repositories(&self) -> RemoteResult<Vec<RepoHandle>> {
        let mut st = self.state();
        st.calls.push(HostCall::ListRepositories);
        if st.faults.fail_listing {
            return Err(RemoteError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let mut repos: Vec<&MemoryRepo> = st.repos.values().collect();
        repos.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(repos.into_iter().map(|r| r.handle.clone()).collect())
    }

    async fn read_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        _branch: &str,
    ) -> RemoteResult<Option<RemoteFile>> {
        let mut st = self.state();
        st.calls.push(HostCall::ReadFile(path.to_string()));
        if st.faults.fail_reads.contains(path) {
            return Err(RemoteError::Status {
                status: 500,
                body: "read failed".into(),
            });
        }
        let stale = st.faults.stale_after_read.remove(path);
        let r = st.repo_mut(&repo.name)?;
        let Some(stored) = r.files.get_mut(path) else {
            return Ok(None);
        };
        let file = RemoteFile {
            path: path.to_string(),
            sha: stored.sha.clone(),
            content: stored.content.clone(),
        };
        if stale {
            stored.content.push_str("\n<!-- external edit -->");
            stored.sha = blob_sha(path, &stored.content);
        }
        Ok(Some(file))
    }

    async fn create_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        content: &str,
        _branch: &str,
    ) -> RemoteResult<CommitRef> {
        let mut st = self.state();
        st.calls.push(HostCall::CreateFile(path.to_string()));
        if st.faults.reject_creates.contains(path) {
            return Err(RemoteError::Status {
                status: 500,
                body: "create rejected".into(),
            });
        }
        let r = st.repo_mut(&repo.name)?;
        if r.files.contains_key(path) {
            return Err(RemoteError::Conflict("\"sha\" wasn't supplied".into()));
        }
        r.files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                sha: blob_sha(path, content),
            },
        );
        st.commit(&repo.name, message.to_string())
    }

    async fn update_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        content: &str,
        sha: &str,
        _branch: &str,
    ) -> RemoteResult<CommitRef> {
        let mut st = self.state();
        st.calls.push(HostCall::UpdateFile(path.to_string()));
        if st.faults.reject_updates.contains(path) {
            return Err(RemoteError::Conflict(format!("{path} does not match {sha}")));
        }
        let r = st.repo_mut(&repo.name)?;
        let Some(stored) = r.files.get_mut(path) else {
            return Err(RemoteError::NotFound);
        };
        if stored.sha != sha {
            return Err(RemoteError::Conflict(format!("{path} does not match {sha}")));
        }
        stored.content = content.to_string();
        stored.sha = blob_sha(path, content);
        st.commit(&repo.name, message.to_string())
    }

    async fn delete_file(
        &self,
        repo: &RepoHandle,
        path: &str,
        message: &str,
        sha: &str,
        _branch: &str,
    ) -> RemoteResult<()> {
        let mut st = self.state();
        st.calls.push(HostCall::DeleteFile(path.to_string()));
        if st.faults.reject_deletes.contains(path) {
            return Err(RemoteError::Status {
                status: 500,
                body: "delete rejected".into(),
            });
        }
        let r = st.repo_mut(&repo.name)?;
        match r.files.get(path) {
            None => return Err(RemoteError::NotFound),
            Some(stored) if stored.sha != sha => {
                return Err(RemoteError::Conflict(format!("{path} does not match {sha}")))
            }
            Some(_) => {}
        }
        r.files.remove(path);
        st.commit(&repo.name, message.to_string())?;
        Ok(())
    }

    async fn list_commits(&self, repo: &RepoHandle, limit: usize) -> RemoteResult<Vec<CommitRef>> {
        let mut st = self.state();
        st.calls.push(HostCall::ListCommits);
        if st.faults.fail_commits {
            return Err(RemoteError::Transport("timed out".into()));
        }
        let r = st.repo_mut(&repo.name)?;
        if r.commits.is_empty() {
            return Err(RemoteError::Conflict("Git Repository is empty.".into()));
        }
        Ok(r.commits.iter().rev().take(limit).cloned().collect())
    }

    async fn enable_hosting(
        &self,
        repo: &RepoHandle,
        branch: &str,
        path: &str,
    ) -> RemoteResult<HostingAck> {
        let mut st = self.state();
        st.calls.push(HostCall::EnableHosting {
            branch: branch.to_string(),
            path: path.to_string(),
        });
        if st.faults.fail_hosting {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        if let Some(status) = st.faults.hosting_status {
            return Ok(HostingAck {
                status,
                body: "forced".into(),
            });
        }
        let r = st.repo_mut(&repo.name)?;
        if r.hosting.is_some() {
            return Ok(HostingAck {
                status: 409,
                body: "already enabled".into(),
            });
        }
        r.hosting = Some("building".into());
        Ok(HostingAck {
            status: 201,
            body: String::new(),
        })
    }

    async fn trigger_hosting_rebuild(&self, repo: &RepoHandle) -> RemoteResult<HostingAck> {
        let mut st = self.state();
        st.calls.push(HostCall::TriggerRebuild);
        if st.faults.fail_hosting {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        if let Some(status) = st.faults.hosting_status {
            return Ok(HostingAck {
                status,
                body: "forced".into(),
            });
        }
        let r = st.repo_mut(&repo.name)?;
        if r.hosting.is_none() {
            return Ok(HostingAck {
                status: 404,
                body: "hosting not enabled".into(),
            });
        }
        r.hosting = Some("building".into());
        Ok(HostingAck {
            status: 201,
            body: String::new(),
        })
    }

    async fn hosting_status(&self, repo: &RepoHandle) -> RemoteResult<Option<String>> {
        let mut st = self.state();
        st.calls.push(HostCall::HostingStatus);
        Ok(st.repo_mut(&repo.name)?.hosting.clone())
    }
}
