use crate::error::{CoreError, Result};
use crate::settle::SettlePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GitHubConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            token: String::new(),
            api_base: default_api_base(),
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
    ChatCompletions,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "chat_completions" | "chat-completions" | "openai" | "groq" => {
                Some(Self::ChatCompletions)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: String::new(),
            model: None,
            endpoint: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(m), _) => m,
            (None, LlmProvider::Gemini) => "gemini-2.0-flash",
            (None, LlmProvider::ChatCompletions) => "qwen/qwen3-32b",
        }
    }

    pub fn endpoint(&self) -> String {
        match (&self.endpoint, self.provider) {
            (Some(e), _) => e.clone(),
            (None, LlmProvider::Gemini) => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model()
            ),
            (None, LlmProvider::ChatCompletions) => {
                "https://api.groq.com/openai/v1/chat/completions".to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_unit")]
    pub backoff_unit_ms: u64,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
    /// Used when a request carries no callback URL.
    #[serde(default)]
    pub default_url: Option<String>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_unit() -> u64 {
    1000
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit(),
            timeout_secs: default_notify_timeout(),
            default_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// Shared secret every inbound request must present.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    #[serde(default)]
    pub settle: SettlePolicy,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default = "default_soft_deadline")]
    pub soft_deadline_secs: u64,
    #[serde(default = "default_critical_file")]
    pub critical_file: String,
}

fn default_soft_deadline() -> u64 {
    600
}

fn default_critical_file() -> String {
    "index.html".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            llm: LlmConfig::default(),
            secret: String::new(),
            settle: SettlePolicy::default(),
            notify: NotifyConfig::default(),
            soft_deadline_secs: default_soft_deadline(),
            critical_file: default_critical_file(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional YAML file, then overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: ServiceConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Overlay values from `lookup` (normally the environment). Empty values
    /// are ignored so an unset variable never clears a file setting.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GITHUB_USER") {
            self.github.user = v;
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.github.token = v;
        }
        if let Some(v) = get("GITHUB_API_URL") {
            self.github.api_base = v;
        }
        if let Some(v) = get("STUDENT_SECRET") {
            self.secret = v;
        }
        if let Some(provider) = get("LLM_PROVIDER").and_then(|v| LlmProvider::parse(&v)) {
            self.llm.provider = provider;
        }
        let key = match self.llm.provider {
            LlmProvider::Gemini => get("GEMINI_API_KEY"),
            LlmProvider::ChatCompletions => get("GROQ_API_KEY"),
        };
        if let Some(v) = key.or_else(|| get("LLM_API_KEY")) {
            self.llm.api_key = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = get("LLM_ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Some(v) = get("EVALUATION_API_URL") {
            self.notify.default_url = Some(v);
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn soft_deadline(&self) -> Duration {
        Duration::from_secs(self.soft_deadline_secs)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: &str| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: message.to_string(),
            })
        };

        if self.github.user.trim().is_empty() {
            error("github.user is not set (GITHUB_USER)");
        }
        if self.github.token.trim().is_empty() {
            error("github.token is not set (GITHUB_TOKEN)");
        }
        if self.secret.is_empty() {
            error("secret is not set (STUDENT_SECRET)");
        }
        if self.llm.api_key.trim().is_empty() {
            error("llm.api_key is not set (GEMINI_API_KEY / GROQ_API_KEY)");
        }
        if self.critical_file.trim().is_empty() {
            error("critical_file must name a repository path");
        }
        if self.notify.max_attempts == 0 {
            error("notify.max_attempts must be at least 1");
        }

        if self.notify.max_attempts > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "notify.max_attempts={} (>10 is unusual)",
                    self.notify.max_attempts
                ),
            });
        }
        if self.soft_deadline_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "soft_deadline_secs is 0; every request will log an overrun".into(),
            });
        }

        warnings
    }

    /// Fail with [`CoreError::Configuration`] if any error-level warning exists.
    pub fn ensure_ready(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Configuration(errors.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
