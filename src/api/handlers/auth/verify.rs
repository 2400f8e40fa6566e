use axum::{
    extract::{Extension, Multipart},
    response::Json,
};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::handlers::{client_ip::ClientIp, error::ApiError, form::FormFields, ErrorDetail};
use crate::gate::{VerificationOrchestrator, VerificationOutcome};

/// Multipart fields accepted by `/auth/verify`.
#[derive(ToSchema, Debug)]
pub struct VerifyForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    pub nonce: String,
}

#[utoipa::path(
    post,
    path= "/auth/verify",
    request_body(content = VerifyForm, content_type = "multipart/form-data"),
    responses (
        (status = 200, description = "Access decision", body = VerificationOutcome),
        (status = 400, description = "Invalid image or missing field", body = ErrorDetail),
        (status = 403, description = "Invalid or expired challenge", body = ErrorDetail),
        (status = 423, description = "Gateway locked", body = ErrorDetail),
        (status = 502, description = "Face service failure", body = ErrorDetail),
    ),
    tag= "auth"
)]
#[instrument(skip(gate, multipart))]
pub async fn verify(
    gate: Extension<Arc<VerificationOrchestrator>>,
    ClientIp(ip): ClientIp,
    multipart: Multipart,
) -> Result<Json<VerificationOutcome>, ApiError> {
    let form = FormFields::read(multipart).await?;
    let image = form.bytes("image")?;
    let nonce = form.text("nonce")?;

    Ok(Json(gate.verify(&image, &nonce, &ip).await?))
}
