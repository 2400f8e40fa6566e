use axum::{extract::Extension, response::Json};
use std::sync::Arc;

use crate::gate::{LockStatus, VerificationOrchestrator};

#[utoipa::path(
    get,
    path= "/api/status",
    responses (
        (status = 200, description = "Global lock state", body = LockStatus),
    ),
    tag= "monitor"
)]
pub async fn status(gate: Extension<Arc<VerificationOrchestrator>>) -> Json<LockStatus> {
    Json(gate.lock_status().await)
}
