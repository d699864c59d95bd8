use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;
use crate::workflow::{self, BuildRequest, BuildResponse};

/// POST /build: run one build (round 1) or revise (round ≥ 2) cycle.
///
/// The response is sent only after publication and the evaluation callback
/// have finished, so a 200 means the repository is live.
pub async fn build(
    State(app): State<AppState>,
    Json(req): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, AppError> {
    workflow::run(&app, req).await.map(Json)
}
