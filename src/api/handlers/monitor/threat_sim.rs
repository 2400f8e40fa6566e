use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::handlers::{client_ip::ClientIp, error::ApiError, ErrorDetail};
use crate::gate::{AttackType, SecurityLevel, SimulationReport, VerificationOrchestrator};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThreatSimRequest {
    attack_type: AttackType,
    #[serde(default)]
    target_user: String,
    security_level: SecurityLevel,
}

#[utoipa::path(
    post,
    path= "/api/threat-sim/execute",
    request_body = ThreatSimRequest,
    responses (
        (status = 200, description = "Verdict; blocked HIGH attacks lock", body = SimulationReport),
        (status = 422, description = "Unknown attack type or security level", body = ErrorDetail),
        (status = 502, description = "Threat service failure", body = ErrorDetail),
    ),
    tag= "monitor"
)]
#[instrument(skip(gate, payload))]
pub async fn execute(
    gate: Extension<Arc<VerificationOrchestrator>>,
    ClientIp(ip): ClientIp,
    payload: Result<Json<ThreatSimRequest>, JsonRejection>,
) -> Result<Json<SimulationReport>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;

    let report = gate
        .simulate(
            request.attack_type,
            &request.target_user,
            request.security_level,
            &ip,
        )
        .await?;

    Ok(Json(report))
}
