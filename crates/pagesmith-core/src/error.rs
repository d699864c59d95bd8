use thiserror::Error;

/// Failures reported by a [`RepoHost`](crate::remote::RepoHost) implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    /// The write was rejected because the concurrency token was stale or missing.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("repository not found for task '{0}'")]
    RepositoryNotFound(String),

    #[error("could not create repository '{name}': {source}")]
    RepositoryCreate {
        name: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not list repositories while resolving task '{task}': {source}")]
    RepositoryLookup {
        task: String,
        #[source]
        source: RemoteError,
    },

    #[error("critical file '{path}' could not be written: {reason}")]
    CriticalFile { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// True for the failures that mean the target repository could not be
    /// created or located.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            CoreError::RepositoryNotFound(_)
                | CoreError::RepositoryCreate { .. }
                | CoreError::RepositoryLookup { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
