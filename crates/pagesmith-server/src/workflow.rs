//! One build or revise round: generate, publish, notify.

use app_generator::Attachment;
use pagesmith_core::{PublicationResult, SyncMode, SyncRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::notifier::EvaluationPayload;
use crate::state::AppState;

/// Inbound webhook body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    #[serde(default)]
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub repo_url: Option<String>,
}

impl std::fmt::Display for BuildRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task '{}' round {}", self.task, self.round)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResponse {
    pub status: String,
    pub message: String,
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub notified: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Soft deadline
// ---------------------------------------------------------------------------

/// Wall-clock budget for one round. Exceeding it is logged, never enforced.
pub struct SoftDeadline {
    started: Instant,
    budget: Duration,
}

impl SoftDeadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Logs and returns `true` if the budget is spent.
    pub fn check(&self, stage: &str) -> bool {
        let elapsed = self.elapsed();
        let over = elapsed > self.budget;
        if over {
            warn!(
                stage,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "soft deadline exceeded"
            );
        }
        over
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Task identifiers become repository names: `[A-Za-z0-9._-]+`.
pub fn validate_task(task: &str) -> Result<(), AppError> {
    if task.is_empty()
        || !task
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(AppError::bad_request(format!(
            "Invalid task '{task}': must contain only letters, digits, '.', '-' and '_'"
        )));
    }
    Ok(())
}

fn validate(req: &BuildRequest) -> Result<(), AppError> {
    validate_task(&req.task)?;
    if req.round == 0 {
        return Err(AppError::bad_request("round must be 1 or greater"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

pub async fn run(app: &AppState, req: BuildRequest) -> Result<BuildResponse, AppError> {
    if !app.secret.verify(&req.secret) {
        warn!(task = %req.task, "invalid secret");
        return Err(AppError::forbidden("Invalid secret"));
    }
    validate(&req)?;

    let build_id = uuid::Uuid::new_v4();
    let deadline = SoftDeadline::start(app.soft_deadline);
    let mode = SyncMode::from_round(req.round);
    info!(%build_id, task = %req.task, round = req.round, mode = mode.as_str(), "build started");

    let files = app.generator.generate(&req.brief, &req.attachments).await;
    if files.is_empty() {
        error!(%build_id, task = %req.task, "code generation failed");
        return Err(AppError::upstream("Failed to generate app code from LLM"));
    }
    let paths: Vec<&str> = files.paths().collect();
    info!(%build_id, files = ?paths, "generated files");

    let sync = SyncRequest {
        task: req.task.clone(),
        mode,
        repo_url: match mode {
            SyncMode::Create => None,
            SyncMode::Update => req.repo_url.clone(),
        },
        files,
    };
    let published = app.synchronizer.synchronize(&sync).await.map_err(|e| {
        error!(%build_id, task = %req.task, error = %e, "publication failed");
        AppError::from(e)
    })?;
    deadline.check("publish");

    let notified = app
        .notifier
        .notify(&req.evaluation_url, &payload(&req, &published))
        .await;
    deadline.check("notify");

    info!(
        %build_id,
        repo = %published.repo_name,
        revision = %published.revision,
        notified,
        elapsed_ms = deadline.elapsed().as_millis() as u64,
        "build completed"
    );

    Ok(BuildResponse {
        status: "success".into(),
        message: format!("Completed request for {req}"),
        repo_url: published.repo_url,
        pages_url: published.pages_url,
        commit_sha: published.revision.to_string(),
        notified,
        warnings: published.warnings.iter().map(ToString::to_string).collect(),
    })
}

fn payload(req: &BuildRequest, published: &PublicationResult) -> EvaluationPayload {
    EvaluationPayload {
        email: req.email.clone(),
        task: req.task.clone(),
        round: req.round,
        nonce: req.nonce.clone(),
        repo_url: published.repo_url.clone(),
        commit_sha: published.revision.to_string(),
        pages_url: published.pages_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_validation() {
        assert!(validate_task("quiz-app_v2.1").is_ok());
        assert!(validate_task("").is_err());
        assert!(validate_task("quiz app").is_err());
        assert!(validate_task("../etc").is_err());
    }

    #[test]
    fn request_defaults() {
        let req: BuildRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.c",
            "secret": "s",
            "task": "quiz",
            "round": 1,
            "nonce": "n",
            "brief": "b"
        }))
        .unwrap();
        assert!(req.attachments.is_empty());
        assert!(req.repo_url.is_none());
        assert_eq!(req.evaluation_url, "");
        assert_eq!(req.to_string(), "task 'quiz' round 1");
    }

    #[tokio::test(start_paused = true)]
    async fn soft_deadline_only_reports() {
        let deadline = SoftDeadline::start(Duration::from_secs(1));
        assert!(!deadline.check("early"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(deadline.check("late"));
    }
}
