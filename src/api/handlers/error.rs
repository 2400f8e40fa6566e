use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::gate::GateError;

/// Error body shared by every endpoint.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    Gate(GateError),
    /// Malformed request body (multipart framing, JSON shape).
    BadRequest(String),
    Unprocessable(String),
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self::Gate(err)
    }
}

#[must_use]
pub fn status_code(err: &GateError) -> StatusCode {
    match err {
        GateError::InvalidUsername
        | GateError::InvalidRole
        | GateError::MissingField(_)
        | GateError::InvalidImage(_)
        | GateError::LivenessRejected { .. }
        | GateError::NoFaceDetected => StatusCode::BAD_REQUEST,
        GateError::UsernameTaken => StatusCode::CONFLICT,
        GateError::UnknownUser => StatusCode::NOT_FOUND,
        GateError::SystemLocked { .. } => StatusCode::LOCKED,
        GateError::InvalidChallenge => StatusCode::FORBIDDEN,
        GateError::FaceService(_) | GateError::ThreatService(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Gate(err) => {
                let status = status_code(&err);
                if status.is_server_error() {
                    error!("Upstream failure: {}", err);
                } else {
                    warn!("Request rejected: {}", err);
                }
                (status, err.to_string())
            }
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::Unprocessable(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
        };

        (status, Json(ErrorDetail { detail })).into_response()
    }
}
