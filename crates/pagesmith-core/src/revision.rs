use tracing::warn;

use crate::remote::{RepoHandle, RepoHost};
use crate::types::Revision;

/// Latest commit on the default branch, or [`Revision::Unknown`].
///
/// Returns the reason alongside `Unknown` so callers can surface it.
pub async fn latest_revision(host: &dyn RepoHost, repo: &RepoHandle) -> (Revision, Option<String>) {
    match host.list_commits(repo, 1).await {
        Ok(commits) => match commits.into_iter().next() {
            Some(commit) => (Revision::Known(commit.sha), None),
            None => {
                warn!(repo = %repo.name, "no commits found");
                (Revision::Unknown, Some("no commits found".to_string()))
            }
        },
        Err(e) => {
            warn!(repo = %repo.name, error = %e, "could not read latest commit");
            (Revision::Unknown, Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use crate::remote::NewRepository;

    #[tokio::test]
    async fn reads_most_recent_commit() {
        let host = MemoryHost::new("alice");
        let repo = host.seed_repository("quiz-app-1", &[]);
        let commit = host
            .create_file(&repo, "index.html", "Add index.html", "<html></html>", "main")
            .await
            .unwrap();

        let (revision, reason) = latest_revision(&host, &repo).await;
        assert_eq!(revision, Revision::Known(commit.sha));
        assert!(reason.is_none());
    }

    #[tokio::test]
    async fn listing_failure_yields_unknown() {
        let host = MemoryHost::new("alice");
        let repo = host.seed_repository("quiz-app-1", &[]);
        host.fail_commit_listing();

        let (revision, reason) = latest_revision(&host, &repo).await;
        assert_eq!(revision, Revision::Unknown);
        assert!(reason.is_some());
    }

    #[tokio::test]
    async fn empty_repository_yields_unknown() {
        let host = MemoryHost::new("alice");
        let repo = host
            .create_repository(&NewRepository {
                name: "bare".into(),
                description: String::new(),
                private: false,
                auto_init: false,
            })
            .await
            .unwrap();

        let (revision, _) = latest_revision(&host, &repo).await;
        assert_eq!(revision.as_str(), "unknown");
    }
}
