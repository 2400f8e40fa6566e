use super::services::{FaceError, ThreatError};

/// Rejection raised by a gateway operation.
///
/// Verification denials (liveness failure, no face, low similarity) are not
/// errors; they come back as a `VerificationOutcome` with `authorized = false`.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Invalid username")]
    InvalidUsername,
    #[error("Role is required")]
    InvalidRole,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Username already exists")]
    UsernameTaken,
    #[error("User not found")]
    UnknownUser,
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Image Quality Check Failed: {reason}")]
    LivenessRejected { reason: String },
    #[error("No face detected or confidence too low. Please realign.")]
    NoFaceDetected,
    #[error("System locked: {remaining_seconds}s remaining")]
    SystemLocked { remaining_seconds: u64 },
    #[error("Invalid or expired challenge (Replay Attack Protection)")]
    InvalidChallenge,
    #[error("Face service failure: {0}")]
    FaceService(FaceError),
    #[error("Threat service failure: {0}")]
    ThreatService(#[from] ThreatError),
}

impl From<FaceError> for GateError {
    fn from(err: FaceError) -> Self {
        match err {
            FaceError::InvalidImage(reason) => Self::InvalidImage(reason),
            other => Self::FaceService(other),
        }
    }
}
