use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

use pagesmith_core::config::{LlmConfig, LlmProvider};
use pagesmith_core::DesiredFiles;

use crate::error::{GeneratorError, Result};
use crate::extract::extract;
use crate::prompt::{combined_prompt, user_prompt, SYSTEM_PROMPT};
use crate::types::{
    Attachment, ChatMessage, ChatRequest, ChatResponse, GeminiContent, GeminiPart, GeminiRequest,
    GeminiResponse,
};

/// Path to content, entry point first. Empty means generation failed.
pub type GeneratedFiles = DesiredFiles;

pub const INDEX_PATH: &str = "index.html";
pub const README_PATH: &str = "README.md";

// ─── CodeGenerator ────────────────────────────────────────────────────────

#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Produce the app for `brief`. Failures are logged and come back as an
    /// empty set.
    async fn generate(&self, brief: &str, attachments: &[Attachment]) -> GeneratedFiles;
}

// ─── LlmGenerator ─────────────────────────────────────────────────────────

/// [`CodeGenerator`] backed by a hosted LLM.
pub struct LlmGenerator {
    http: reqwest::Client,
    provider: LlmProvider,
    api_key: String,
    model: String,
    endpoint: String,
    timeout_secs: u64,
}

impl LlmGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GeneratorError::Configuration(
                "an LLM API key is required (GEMINI_API_KEY / GROQ_API_KEY)".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            provider: config.provider,
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
            endpoint: config.endpoint(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Like [`CodeGenerator::generate`] but keeps the error.
    pub async fn try_generate(
        &self,
        brief: &str,
        attachments: &[Attachment],
    ) -> Result<GeneratedFiles> {
        let raw = match self.provider {
            LlmProvider::Gemini => self.gemini(brief, attachments).await?,
            LlmProvider::ChatCompletions => self.chat(brief, attachments).await?,
        };
        if raw.trim().is_empty() {
            return Err(GeneratorError::EmptyResponse);
        }
        info!(chars = raw.len(), "LLM response received");

        let extracted = extract(&raw)?;
        let mut files = GeneratedFiles::new();
        files.insert(INDEX_PATH, extracted.html);
        files.insert(README_PATH, extracted.readme);
        Ok(files)
    }

    async fn gemini(&self, brief: &str, attachments: &[Attachment]) -> Result<String> {
        let mut parts = vec![GeminiPart::text(combined_prompt(brief, attachments, true))];
        for att in attachments {
            if let Some(data) = att.data_url().filter(|d| d.base64) {
                parts.push(GeminiPart::inline(data.mime_type, data.data));
            }
        }
        let body = GeminiRequest {
            contents: vec![GeminiContent { role: None, parts }],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let resp = check(resp).await?;
        let parsed: GeminiResponse = resp.json().await?;
        Ok(parsed.text())
    }

    async fn chat(&self, brief: &str, attachments: &[Attachment]) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt(brief, attachments, false)),
            ],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let resp = check(resp).await?;
        let parsed: ChatResponse = resp.json().await?;
        Ok(parsed.text())
    }

    fn classify(&self, err: reqwest::Error) -> GeneratorError {
        if err.is_timeout() {
            GeneratorError::Timeout(self.timeout_secs)
        } else {
            GeneratorError::Http(err)
        }
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GeneratorError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CodeGenerator for LlmGenerator {
    async fn generate(&self, brief: &str, attachments: &[Attachment]) -> GeneratedFiles {
        match self.try_generate(brief, attachments).await {
            Ok(files) => files,
            Err(e) => {
                error!(provider = ?self.provider, error = %e, "generation failed");
                GeneratedFiles::new()
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
