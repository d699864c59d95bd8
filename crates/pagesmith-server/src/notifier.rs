//! Reporting a finished build to the evaluation service.

use pagesmith_core::config::NotifyConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Body POSTed to the evaluation callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

#[derive(Debug, Error)]
enum NotifyError {
    /// 5xx, 429, timeouts and transport failures.
    #[error("{0}")]
    Retryable(String),

    #[error("rejected with {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub struct Notifier {
    http: reqwest::Client,
    max_attempts: u32,
    unit: Duration,
    default_url: Option<String>,
}

impl Notifier {
    pub fn new(config: &NotifyConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            max_attempts: config.max_attempts.max(1),
            unit: Duration::from_millis(config.backoff_unit_ms),
            default_url: config
                .default_url
                .clone()
                .filter(|u| !u.trim().is_empty()),
        })
    }

    /// Delay after failed attempt `attempt` (0-based): `unit × 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Deliver `payload`, retrying transient failures. Returns `false` when
    /// there is nowhere to send it, on a non-retryable rejection, or when
    /// attempts run out.
    pub async fn notify(&self, url: &str, payload: &EvaluationPayload) -> bool {
        let url = match (url.trim(), &self.default_url) {
            ("", Some(fallback)) => fallback.as_str(),
            ("", None) => {
                warn!(task = %payload.task, "no evaluation url, skipping notification");
                return false;
            }
            (url, _) => url,
        };

        for attempt in 0..self.max_attempts {
            match self.attempt(url, payload).await {
                Ok(status) => {
                    info!(url, status, attempt = attempt + 1, "evaluation service notified");
                    return true;
                }
                Err(NotifyError::Rejected { status, body }) => {
                    warn!(url, status, %body, "evaluation service rejected notification");
                    return false;
                }
                Err(NotifyError::Retryable(reason)) => {
                    let last = attempt + 1 == self.max_attempts;
                    warn!(url, attempt = attempt + 1, max = self.max_attempts, %reason, "notification attempt failed");
                    if !last {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }
        warn!(url, attempts = self.max_attempts, "giving up on notification");
        false
    }

    async fn attempt(&self, url: &str, payload: &EvaluationPayload) -> Result<u16, NotifyError> {
        let resp = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Retryable(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }
        let body = resp.text().await.unwrap_or_default();
        if status.is_server_error() || status.as_u16() == 429 {
            Err(NotifyError::Retryable(format!("status {status}: {body}")))
        } else {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
