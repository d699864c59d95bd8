use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagesmith_core::error::CoreError;

// ---------------------------------------------------------------------------
// Internal sentinels for request-level failures
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP status through the `anyhow::Error` chain for
/// failures that have no counterpart in `CoreError`.
#[derive(Debug)]
struct StatusError {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StatusError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn with_status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            StatusError {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }

    /// 400 Bad Request.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    /// 403 Forbidden.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    /// 502 Bad Gateway: an upstream collaborator produced nothing usable.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_GATEWAY, msg)
    }

    pub fn status(&self) -> StatusCode {
        if let Some(s) = self.0.downcast_ref::<StatusError>() {
            return s.status;
        }
        match self.0.downcast_ref::<CoreError>() {
            Some(CoreError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Some(CoreError::RepositoryNotFound(_)) => StatusCode::NOT_FOUND,
            // The host refused to create or list repositories.
            Some(CoreError::RepositoryCreate { .. } | CoreError::RepositoryLookup { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            Some(CoreError::CriticalFile { .. }) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "status": "error", "detail": format!("{:#}", self.0) });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
