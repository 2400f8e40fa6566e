use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::handlers::{client_ip::ClientIp, error::ApiError, form::FormFields, ErrorDetail};
use crate::gate::{PublicIdentity, VerificationOrchestrator};

/// Multipart fields accepted by `/auth/register`.
#[derive(ToSchema, Debug)]
pub struct RegisterForm {
    pub username: String,
    pub role: String,
}

#[utoipa::path(
    post,
    path= "/auth/register",
    request_body(content = RegisterForm, content_type = "multipart/form-data"),
    responses (
        (status = 201, description = "Identity created, not yet enrolled", body = PublicIdentity),
        (status = 400, description = "Invalid username or role", body = ErrorDetail),
        (status = 409, description = "Username already exists", body = ErrorDetail),
    ),
    tag= "auth"
)]
#[instrument(skip(gate, multipart))]
pub async fn register(
    gate: Extension<Arc<VerificationOrchestrator>>,
    ClientIp(ip): ClientIp,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = FormFields::read(multipart).await?;
    let username = form.text("username")?;
    let role = form.text("role")?;

    let identity = gate.register(&username, &role, &ip).await?;

    Ok((StatusCode::CREATED, Json(identity)))
}
