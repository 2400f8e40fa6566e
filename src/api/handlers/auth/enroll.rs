use axum::{
    extract::{Extension, Multipart},
    response::Json,
};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::handlers::{client_ip::ClientIp, error::ApiError, form::FormFields, ErrorDetail};
use crate::gate::{EnrollmentOutcome, VerificationOrchestrator};

/// Multipart fields accepted by `/auth/enroll`.
#[derive(ToSchema, Debug)]
pub struct EnrollForm {
    pub username: String,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[utoipa::path(
    post,
    path= "/auth/enroll",
    request_body(content = EnrollForm, content_type = "multipart/form-data"),
    responses (
        (status = 200, description = "Face template enrolled", body = EnrollmentOutcome),
        (status = 400, description = "Bad image, liveness failure or no face", body = ErrorDetail),
        (status = 404, description = "User not found", body = ErrorDetail),
        (status = 502, description = "Face service failure", body = ErrorDetail),
    ),
    tag= "auth"
)]
#[instrument(skip(gate, multipart))]
pub async fn enroll(
    gate: Extension<Arc<VerificationOrchestrator>>,
    ClientIp(ip): ClientIp,
    multipart: Multipart,
) -> Result<Json<EnrollmentOutcome>, ApiError> {
    let form = FormFields::read(multipart).await?;
    let username = form.text("username")?;
    let image = form.bytes("image")?;

    Ok(Json(gate.enroll(&username, &image, &ip).await?))
}
