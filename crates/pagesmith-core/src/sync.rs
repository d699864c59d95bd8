//! The repository synchronizer: resolve, reconcile, scaffold, host, confirm.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::ServiceConfig;
use crate::error::{CoreError, Result};
use crate::github::GitHubClient;
use crate::hosting;
use crate::lease::RepoLeases;
use crate::reconcile::reconcile;
use crate::remote::RepoHost;
use crate::resolver::resolve;
use crate::revision::latest_revision;
use crate::scaffold::ensure_scaffold;
use crate::settle::SettlePolicy;
use crate::types::{pages_url, DesiredFiles, PublicationResult, SyncMode, SyncWarning};

/// One synchronization call.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub task: String,
    pub mode: SyncMode,
    pub repo_url: Option<String>,
    pub files: DesiredFiles,
}

/// Summary of the knobs a [`Synchronizer`] was built with, logged when the
/// server starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchronizerInfo {
    pub owner: String,
    pub critical_file: String,
    pub settle: SettlePolicy,
}

pub struct Synchronizer {
    host: Arc<dyn RepoHost>,
    settle: SettlePolicy,
    leases: RepoLeases,
    critical_file: String,
}

impl Synchronizer {
    pub fn new(host: Arc<dyn RepoHost>, settle: SettlePolicy) -> Self {
        Self {
            host,
            settle,
            leases: RepoLeases::new(),
            critical_file: "index.html".to_string(),
        }
    }

    pub fn with_critical_file(mut self, path: impl Into<String>) -> Self {
        self.critical_file = path.into();
        self
    }

    /// Build against the GitHub REST API. Missing credentials fail here,
    /// before any remote call.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = GitHubClient::new(&config.github)?;
        Ok(Self::new(Arc::new(client), config.settle.clone())
            .with_critical_file(config.critical_file.clone()))
    }

    pub fn info(&self) -> SynchronizerInfo {
        SynchronizerInfo {
            owner: self.host.owner().to_string(),
            critical_file: self.critical_file.clone(),
            settle: self.settle.clone(),
        }
    }

    /// Run one call to completion or to its first fatal failure.
    ///
    /// Fatal: resolution failure, critical-file failure. Everything else is
    /// collected in [`PublicationResult::warnings`].
    #[instrument(skip_all, fields(task = %req.task, mode = req.mode.as_str()))]
    pub async fn synchronize(&self, req: &SyncRequest) -> Result<PublicationResult> {
        if req.task.trim().is_empty() {
            return Err(CoreError::Configuration("task must not be empty".into()));
        }
        let host = self.host.as_ref();

        let repo = resolve(
            host,
            &self.settle,
            &req.task,
            req.mode,
            req.repo_url.as_deref(),
            Utc::now(),
        )
        .await?;
        let _lease = self.leases.acquire(&repo.name).await;
        info!(repo = %repo.name, files = req.files.len(), "synchronizing");

        let reconciled = reconcile(host, &self.settle, &repo, &req.files, &self.critical_file).await?;
        let mut warnings = reconciled.warnings;

        warnings.extend(ensure_scaffold(host, &self.settle, &repo, &req.files).await);

        let hosting_warning = match req.mode {
            SyncMode::Create => hosting::enable_hosting(host, &self.settle, &repo).await,
            SyncMode::Update => hosting::trigger_rebuild(host, &self.settle, &repo).await,
        };
        warnings.extend(hosting_warning);

        let (revision, unknown_reason) = latest_revision(host, &repo).await;
        if let Some(reason) = unknown_reason {
            warnings.push(SyncWarning::Revision { reason });
        }

        if !warnings.is_empty() {
            warn!(repo = %repo.name, count = warnings.len(), "completed with warnings");
        }
        info!(repo = %repo.name, %revision, "synchronized");

        Ok(PublicationResult {
            pages_url: pages_url(&repo.owner, &repo.name),
            repo_url: repo.html_url,
            repo_name: repo.name,
            revision,
            mode: req.mode,
            files: reconciled.files,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{HostCall, MemoryHost};
    use crate::scaffold::{LICENSE_PATH, README_PATH};
    use crate::types::{FileAction, Revision};

    fn synchronizer(host: &Arc<MemoryHost>) -> Synchronizer {
        Synchronizer::new(host.clone(), SettlePolicy::immediate())
    }

    fn request(task: &str, round: u32, repo_url: Option<&str>, files: &[(&str, &str)]) -> SyncRequest {
        SyncRequest {
            task: task.to_string(),
            mode: SyncMode::from_round(round),
            repo_url: repo_url.map(str::to_string),
            files: files.iter().copied().collect(),
        }
    }

    fn position(calls: &[HostCall], pred: impl Fn(&HostCall) -> bool) -> Option<usize> {
        calls.iter().position(pred)
    }

    #[tokio::test]
    async fn create_round_publishes_new_repository() {
        let host = Arc::new(MemoryHost::new("alice"));
        let html = "<!DOCTYPE html><html><body>quiz</body></html>";

        let result = synchronizer(&host)
            .synchronize(&request("quiz-app", 1, None, &[("index.html", html)]))
            .await
            .unwrap();

        assert!(result.repo_name.starts_with("quiz-app-"));
        assert_eq!(result.repo_name.len(), "quiz-app-".len() + 14);
        assert_eq!(host.file(&result.repo_name, "index.html").as_deref(), Some(html));
        assert!(host.file(&result.repo_name, README_PATH).is_some());
        assert!(host.file(&result.repo_name, LICENSE_PATH).is_some());
        assert_eq!(host.hosting(&result.repo_name).as_deref(), Some("building"));
        assert!(result.revision.is_known());
        assert_eq!(
            result.pages_url,
            format!("https://alice.github.io/{}/", result.repo_name)
        );
        assert_eq!(
            result.repo_url,
            format!("https://github.com/alice/{}", result.repo_name)
        );
        assert!(result.warnings.is_empty());

        let calls = host.calls();
        assert!(!calls.contains(&HostCall::ListRepositories));
        assert!(!calls.contains(&HostCall::TriggerRebuild));
    }

    #[tokio::test]
    async fn revise_round_updates_in_place() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.seed_repository(
            "quiz-app-20250101000000",
            &[
                ("index.html", "<old/>"),
                (README_PATH, "# existing"),
                (LICENSE_PATH, "existing"),
            ],
        );

        let result = synchronizer(&host)
            .synchronize(&request(
                "quiz-app",
                2,
                Some("https://host/user/quiz-app-20250101000000"),
                &[("index.html", "<new content>")],
            ))
            .await
            .unwrap();

        assert_eq!(result.repo_name, "quiz-app-20250101000000");
        assert_eq!(result.action_for("index.html"), Some(&FileAction::Updated));
        assert_eq!(
            host.file("quiz-app-20250101000000", "index.html").as_deref(),
            Some("<new content>")
        );
        assert_eq!(
            host.file("quiz-app-20250101000000", README_PATH).as_deref(),
            Some("# existing")
        );
        assert_eq!(
            host.file("quiz-app-20250101000000", LICENSE_PATH).as_deref(),
            Some("existing")
        );

        let calls = host.calls();
        assert!(!calls.iter().any(|c| matches!(c, HostCall::CreateRepository(_))));
        assert!(calls.contains(&HostCall::TriggerRebuild));
        assert!(!calls.iter().any(|c| matches!(c, HostCall::EnableHosting { .. })));
    }

    #[tokio::test]
    async fn revise_round_without_match_writes_nothing() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.seed_repository("quiz-app-1", &[]);

        let err = synchronizer(&host)
            .synchronize(&request("nonexistent-task", 2, None, &[("index.html", "x")]))
            .await
            .unwrap_err();

        assert!(err.is_resolution());
        assert!(!host.calls().iter().any(HostCall::is_write));
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let host = Arc::new(MemoryHost::new("alice"));
        synchronizer(&host)
            .synchronize(&request("quiz-app", 1, None, &[("index.html", "<html></html>")]))
            .await
            .unwrap();

        let calls = host.calls();
        let created = position(&calls, |c| matches!(c, HostCall::CreateRepository(_))).unwrap();
        let index = position(&calls, |c| *c == HostCall::CreateFile("index.html".into())).unwrap();
        let readme = position(&calls, |c| *c == HostCall::CreateFile(README_PATH.into())).unwrap();
        let license = position(&calls, |c| *c == HostCall::CreateFile(LICENSE_PATH.into())).unwrap();
        let hosting = position(&calls, HostCall::is_hosting).unwrap();
        let revision = position(&calls, |c| *c == HostCall::ListCommits).unwrap();

        assert!(created < index);
        assert!(index < readme);
        assert!(readme < license);
        assert!(license < hosting);
        assert!(hosting < revision);
    }

    #[tokio::test]
    async fn critical_failure_skips_scaffold_and_hosting() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.reject_creates("index.html");

        let err = synchronizer(&host)
            .synchronize(&request("quiz-app", 1, None, &[("index.html", "<html></html>")]))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::CriticalFile { .. }));
        let calls = host.calls();
        assert!(!calls.contains(&HostCall::ReadFile(README_PATH.into())));
        assert!(!calls.iter().any(HostCall::is_hosting));
        assert!(!calls.contains(&HostCall::ListCommits));
    }

    #[tokio::test]
    async fn non_critical_failure_still_publishes() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.reject_creates("app.js");

        let result = synchronizer(&host)
            .synchronize(&request(
                "quiz-app",
                1,
                None,
                &[("index.html", "<html></html>"), ("app.js", "run()")],
            ))
            .await
            .unwrap();

        assert!(matches!(result.action_for("app.js"), Some(FileAction::Failed(_))));
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, SyncWarning::NonCriticalFile { path, .. } if path == "app.js")));
        assert!(host.calls().iter().any(HostCall::is_hosting));
    }

    #[tokio::test]
    async fn configurable_critical_file() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.reject_creates("index.html");

        let result = synchronizer(&host)
            .with_critical_file("main.html")
            .synchronize(&request(
                "quiz-app",
                1,
                None,
                &[("index.html", "<html></html>"), ("main.html", "<html></html>")],
            ))
            .await
            .unwrap();
        assert!(matches!(result.action_for("index.html"), Some(FileAction::Failed(_))));
    }

    #[tokio::test]
    async fn revision_failure_is_not_fatal() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.fail_commit_listing();

        let result = synchronizer(&host)
            .synchronize(&request("quiz-app", 1, None, &[("index.html", "<html></html>")]))
            .await
            .unwrap();

        assert_eq!(result.revision, Revision::Unknown);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, SyncWarning::Revision { .. })));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["revision"], "unknown");
    }

    #[tokio::test]
    async fn hosting_failure_is_not_fatal() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.hosting_responds_with(500);

        let result = synchronizer(&host)
            .synchronize(&request("quiz-app", 1, None, &[("index.html", "<html></html>")]))
            .await
            .unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, SyncWarning::Hosting { .. })));
    }

    #[tokio::test]
    async fn repeated_revision_converges() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.seed_repository("quiz-app-1", &[]);
        let sync = synchronizer(&host);
        let req = request(
            "quiz-app",
            2,
            Some("https://github.com/alice/quiz-app-1"),
            &[("index.html", "<html>v2</html>"), ("README.md", "# quiz")],
        );

        sync.synchronize(&req).await.unwrap();
        let once = host.files("quiz-app-1");
        let second = sync.synchronize(&req).await.unwrap();

        assert_eq!(host.files("quiz-app-1"), once);
        assert!(second.files.iter().all(|f| f.action == FileAction::Updated));
    }

    #[tokio::test]
    async fn empty_task_is_rejected_before_remote_calls() {
        let host = Arc::new(MemoryHost::new("alice"));
        let err = synchronizer(&host)
            .synchronize(&request("  ", 1, None, &[("index.html", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert!(host.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_round_takes_every_settle_pause() {
        let host = Arc::new(MemoryHost::new("alice"));
        let sync = Synchronizer::new(host.clone(), SettlePolicy::default());
        let started = tokio::time::Instant::now();

        sync.synchronize(&request("quiz-app", 1, None, &[("index.html", "<html></html>")]))
            .await
            .unwrap();

        // repo init 3000 + one write 1000 + two scaffold checks 2 x 500 + hosting 2000
        assert_eq!(started.elapsed().as_millis(), 7000);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_revisions_of_one_repository_do_not_interleave() {
        let host = Arc::new(MemoryHost::new("alice"));
        host.seed_repository(
            "quiz-1",
            &[("index.html", "<old/>"), (README_PATH, "# q"), (LICENSE_PATH, "MIT")],
        );
        let sync = Synchronizer::new(host.clone(), SettlePolicy::default());
        let first = request("quiz", 2, Some("https://github.com/alice/quiz-1"), &[("index.html", "<a/>")]);
        let second = request("quiz", 2, Some("https://github.com/alice/quiz-1"), &[("index.html", "<b/>")]);

        let (a, b) = tokio::join!(sync.synchronize(&first), sync.synchronize(&second));
        a.unwrap();
        b.unwrap();

        let calls = host.calls();
        let index_reads: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == HostCall::ReadFile("index.html".into()))
            .map(|(i, _)| i)
            .collect();
        let first_done = position(&calls, |c| *c == HostCall::ListCommits).unwrap();
        assert_eq!(index_reads.len(), 2);
        assert!(index_reads[1] > first_done, "{calls:?}");
        assert_eq!(host.file("quiz-1", "index.html").as_deref(), Some("<b/>"));
        // seed commit plus one update per call
        assert_eq!(host.commit_count("quiz-1"), 3);
    }

    #[test]
    fn from_config_requires_credentials() {
        let cfg = ServiceConfig::default();
        assert!(matches!(
            Synchronizer::from_config(&cfg),
            Err(CoreError::Configuration(_))
        ));
    }
}
