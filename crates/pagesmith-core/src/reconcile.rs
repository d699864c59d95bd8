//! Per-file reconciliation of desired content against a remote repository.

use tracing::{debug, error, warn};

use crate::error::{CoreError, RemoteError, Result};
use crate::remote::{RepoHandle, RepoHost};
use crate::settle::{Settle, SettlePolicy};
use crate::types::{DesiredFiles, FileAction, FileReport, SyncWarning};

/// Outcome of one reconciliation pass.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub files: Vec<FileReport>,
    pub warnings: Vec<SyncWarning>,
}

/// Write every desired file in order.
///
/// A failure on `critical` aborts the pass with [`CoreError::CriticalFile`];
/// files after it are not touched. Any other failure is recorded and the pass
/// continues.
pub async fn reconcile(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
    desired: &DesiredFiles,
    critical: &str,
) -> Result<Reconciliation> {
    let mut out = Reconciliation::default();

    for (path, content) in desired.iter() {
        match write_file(host, settle, repo, path, content).await {
            Ok(action) => {
                debug!(repo = %repo.name, path, ?action, "file reconciled");
                out.files.push(FileReport {
                    path: path.to_string(),
                    action,
                });
            }
            Err(reason) if path == critical => {
                error!(repo = %repo.name, path, %reason, "critical file failed");
                return Err(CoreError::CriticalFile {
                    path: path.to_string(),
                    reason,
                });
            }
            Err(reason) => {
                warn!(repo = %repo.name, path, %reason, "file failed, continuing");
                out.files.push(FileReport {
                    path: path.to_string(),
                    action: FileAction::Failed(reason.clone()),
                });
                out.warnings.push(SyncWarning::NonCriticalFile {
                    path: path.to_string(),
                    reason,
                });
            }
        }
    }

    Ok(out)
}

async fn write_file(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
    path: &str,
    content: &str,
) -> std::result::Result<FileAction, String> {
    let branch = repo.default_branch.as_str();
    let existing = host
        .read_file(repo, path, branch)
        .await
        .map_err(|e| format!("read failed: {e}"))?;

    let action = match existing {
        None => {
            host.create_file(repo, path, &format!("Add {path}"), content, branch)
                .await
                .map_err(|e| format!("create failed: {e}"))?;
            FileAction::Created
        }
        Some(file) => {
            let update = host
                .update_file(repo, path, &format!("Update {path}"), content, &file.sha, branch)
                .await;
            match update {
                Ok(_) => FileAction::Updated,
                Err(rejected) => {
                    warn!(repo = %repo.name, path, error = %rejected, "update rejected, deleting and recreating");
                    recreate(host, settle, repo, path, content)
                        .await
                        .map_err(|e| format!("update failed ({rejected}); recreate failed ({e})"))?;
                    FileAction::Recreated
                }
            }
        }
    };

    settle.pause(Settle::Write).await;
    Ok(action)
}

/// Compensating path: fresh token, delete, settle, create.
async fn recreate(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
    path: &str,
    content: &str,
) -> std::result::Result<(), RemoteError> {
    let branch = repo.default_branch.as_str();
    if let Some(fresh) = host.read_file(repo, path, branch).await? {
        host.delete_file(
            repo,
            path,
            &format!("Delete {path} for update"),
            &fresh.sha,
            branch,
        )
        .await?;
        settle.pause(Settle::Delete).await;
    }
    host.create_file(repo, path, &format!("Recreate {path}"), content, branch)
        .await?;
    Ok(())
}
