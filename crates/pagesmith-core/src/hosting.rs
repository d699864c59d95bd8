//! Static-site hosting: enable once on creation, rebuild on revisions.
//!
//! Both operations are soft. A non-success acknowledgement or a transport
//! error becomes a [`SyncWarning::Hosting`]; the repository is already
//! published at this point.

use tracing::{info, warn};

use crate::remote::{HostingAck, RemoteResult, RepoHandle, RepoHost};
use crate::settle::{Settle, SettlePolicy};
use crate::types::SyncWarning;

/// Hosting source path: the repository root.
pub const SOURCE_PATH: &str = "/";

pub async fn enable_hosting(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
) -> Option<SyncWarning> {
    let ack = host
        .enable_hosting(repo, &repo.default_branch, SOURCE_PATH)
        .await;
    let warning = judge("enable", repo, ack);
    settle.pause(Settle::Hosting).await;
    warning
}

pub async fn trigger_rebuild(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
) -> Option<SyncWarning> {
    let ack = host.trigger_hosting_rebuild(repo).await;
    let warning = judge("rebuild", repo, ack);
    settle.pause(Settle::Hosting).await;
    warning
}

fn judge(action: &str, repo: &RepoHandle, ack: RemoteResult<HostingAck>) -> Option<SyncWarning> {
    let reason = match ack {
        Ok(ack) if ack.is_success() => {
            info!(repo = %repo.name, action, status = ack.status, "hosting acknowledged");
            return None;
        }
        Ok(ack) => format!("status {}: {}", ack.status, ack.body),
        Err(e) => e.to_string(),
    };
    warn!(repo = %repo.name, action, %reason, "hosting request not acknowledged");
    Some(SyncWarning::Hosting {
        action: action.to_string(),
        reason,
    })
}
