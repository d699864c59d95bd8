//! Best-effort default README and LICENSE.

use chrono::{Datelike, Utc};
use tracing::{info, warn};

use crate::remote::{RepoHandle, RepoHost};
use crate::settle::{Settle, SettlePolicy};
use crate::types::{DesiredFiles, SyncWarning};

pub const README_PATH: &str = "README.md";
pub const LICENSE_PATH: &str = "LICENSE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldOutcome {
    /// The path already exists remotely; nothing was written.
    Present,
    Created,
    Failed(String),
}

pub fn default_readme(repo: &RepoHandle) -> String {
    format!(
        "# {}\n\nAuto-generated repository.\n\nMIT License applies.\n",
        repo.name
    )
}

pub fn default_license(repo: &RepoHandle) -> String {
    format!(
        "MIT License

Copyright (c) {year} {owner}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
",
        year = Utc::now().year(),
        owner = repo.owner,
    )
}

/// Create `path` with default content if it does not exist yet.
///
/// Never fails: read and create errors come back as
/// [`ScaffoldOutcome::Failed`]. A read error skips the create, so an
/// unreadable file is never overwritten.
pub async fn ensure_default<F>(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
    path: &str,
    message: &str,
    make: F,
) -> ScaffoldOutcome
where
    F: FnOnce(&RepoHandle) -> String,
{
    let branch = repo.default_branch.as_str();
    let outcome = match host.read_file(repo, path, branch).await {
        Ok(Some(_)) => ScaffoldOutcome::Present,
        Ok(None) => match host
            .create_file(repo, path, message, &make(repo), branch)
            .await
        {
            Ok(_) => {
                info!(repo = %repo.name, path, "added default");
                ScaffoldOutcome::Created
            }
            Err(e) => ScaffoldOutcome::Failed(format!("create failed: {e}")),
        },
        Err(e) => ScaffoldOutcome::Failed(format!("existence check failed: {e}")),
    };
    settle.pause(Settle::Scaffold).await;
    outcome
}

/// README then LICENSE, each skipped when the caller supplied that path.
pub async fn ensure_scaffold(
    host: &dyn RepoHost,
    settle: &SettlePolicy,
    repo: &RepoHandle,
    desired: &DesiredFiles,
) -> Vec<SyncWarning> {
    let defaults: [(&str, &str, fn(&RepoHandle) -> String); 2] = [
        (README_PATH, "Add README", default_readme),
        (LICENSE_PATH, "Add LICENSE", default_license),
    ];

    let mut warnings = Vec::new();
    for (path, message, make) in defaults {
        if desired.contains(path) {
            continue;
        }
        if let ScaffoldOutcome::Failed(reason) =
            ensure_default(host, settle, repo, path, message, make).await
        {
            warn!(repo = %repo.name, path, %reason, "could not add default");
            warnings.push(SyncWarning::Scaffold {
                path: path.to_string(),
                reason,
            });
        }
    }
    warnings
}
