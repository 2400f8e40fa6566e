use axum::{extract::Extension, response::Json};
use std::sync::Arc;

use crate::gate::{MetricSummary, VerificationOrchestrator};

#[utoipa::path(
    get,
    path= "/api/metrics",
    responses (
        (status = 200, description = "Counts over the retained audit window", body = MetricSummary),
    ),
    tag= "monitor"
)]
pub async fn metrics(gate: Extension<Arc<VerificationOrchestrator>>) -> Json<MetricSummary> {
    Json(gate.metrics().await)
}
