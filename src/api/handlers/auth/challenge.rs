use axum::{extract::Extension, response::Json};
use std::sync::Arc;
use tracing::instrument;

use crate::gate::{Challenge, VerificationOrchestrator};

#[utoipa::path(
    post,
    path= "/auth/challenge",
    responses (
        (status = 200, description = "Single-use verification nonce", body = Challenge),
    ),
    tag= "auth"
)]
#[instrument(skip(gate))]
pub async fn challenge(gate: Extension<Arc<VerificationOrchestrator>>) -> Json<Challenge> {
    Json(gate.issue_challenge().await)
}
