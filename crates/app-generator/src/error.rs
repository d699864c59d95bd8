use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM returned empty content")]
    EmptyResponse,

    #[error("Could not extract HTML: {0}")]
    Extract(String),

    #[error("Generator configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
