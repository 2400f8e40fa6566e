use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::api::handlers::{client_ip::ClientIp, error::ApiError, ErrorDetail};
use crate::gate::{
    orchestrator::DEFAULT_LOG_LIMIT, AuditEvent, ExternalEvent, VerificationOrchestrator,
};

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Maximum number of events, newest first.
    limit: Option<usize>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Logged {
    status: String,
}

#[utoipa::path(
    get,
    path= "/api/logs",
    params(LogsQuery),
    responses (
        (status = 200, description = "Audit events, newest first", body = [AuditEvent]),
    ),
    tag= "monitor"
)]
pub async fn logs(
    gate: Extension<Arc<VerificationOrchestrator>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<AuditEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Json(gate.audit_log(limit).await)
}

#[utoipa::path(
    post,
    path= "/api/logs/external",
    request_body = ExternalEvent,
    responses (
        (status = 200, description = "Event recorded under the caller IP", body = Logged),
        (status = 422, description = "Malformed event", body = ErrorDetail),
    ),
    tag= "monitor"
)]
#[instrument(skip(gate, payload))]
pub async fn external(
    gate: Extension<Arc<VerificationOrchestrator>>,
    ClientIp(ip): ClientIp,
    payload: Result<Json<ExternalEvent>, JsonRejection>,
) -> Result<Json<Logged>, ApiError> {
    let Json(event) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;

    gate.ingest_external(event, &ip).await;

    Ok(Json(Logged {
        status: "logged".to_string(),
    }))
}
