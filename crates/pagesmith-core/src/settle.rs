use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Points in the workflow where the remote needs time to converge before the
/// next dependent operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// After creating a repository, before the first file write.
    RepoInit,
    /// After every file write.
    Write,
    /// Between deleting a file and recreating it.
    Delete,
    /// After each scaffold check.
    Scaffold,
    /// After a hosting enable or rebuild request.
    Hosting,
}

/// Named, tunable settle delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlePolicy {
    #[serde(default = "default_repo_init_ms")]
    pub repo_init_ms: u64,
    #[serde(default = "default_write_ms")]
    pub write_ms: u64,
    #[serde(default = "default_delete_ms")]
    pub delete_ms: u64,
    #[serde(default = "default_scaffold_ms")]
    pub scaffold_ms: u64,
    #[serde(default = "default_hosting_ms")]
    pub hosting_ms: u64,
}

fn default_repo_init_ms() -> u64 {
    3000
}

fn default_write_ms() -> u64 {
    1000
}

fn default_delete_ms() -> u64 {
    1000
}

fn default_scaffold_ms() -> u64 {
    500
}

fn default_hosting_ms() -> u64 {
    2000
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            repo_init_ms: default_repo_init_ms(),
            write_ms: default_write_ms(),
            delete_ms: default_delete_ms(),
            scaffold_ms: default_scaffold_ms(),
            hosting_ms: default_hosting_ms(),
        }
    }
}

impl SettlePolicy {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            repo_init_ms: 0,
            write_ms: 0,
            delete_ms: 0,
            scaffold_ms: 0,
            hosting_ms: 0,
        }
    }

    pub fn delay(&self, kind: Settle) -> Duration {
        let ms = match kind {
            Settle::RepoInit => self.repo_init_ms,
            Settle::Write => self.write_ms,
            Settle::Delete => self.delete_ms,
            Settle::Scaffold => self.scaffold_ms,
            Settle::Hosting => self.hosting_ms,
        };
        Duration::from_millis(ms)
    }

    pub async fn pause(&self, kind: Settle) {
        let delay = self.delay(kind);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
