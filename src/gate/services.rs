//! Collaborator seams: the biometric pipeline and the threat simulator.
//!
//! The gateway only consumes verdicts from these services. Both are called
//! without any gateway lock held.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaceError {
    #[error("{0}")]
    InvalidImage(String),
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),
    #[error("face service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreatError {
    #[error("threat simulation failed: {0}")]
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Webp,
}

impl ImageFormat {
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::Webp => "image/webp",
        }
    }
}

/// Decoded capture handed back to the face service for liveness and embedding.
#[derive(Clone, Debug)]
pub struct FaceImage {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl FaceImage {
    #[must_use]
    pub fn new(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Liveness {
    pub is_live: bool,
    pub reason: String,
}

impl Liveness {
    #[must_use]
    pub fn live() -> Self {
        Self {
            is_live: true,
            reason: "ok".to_string(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_live: false,
            reason: reason.into(),
        }
    }
}

/// Fixed-length face feature vector. Never returned over the API.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// # Errors
    /// Returns `FaceError::InvalidEmbedding` for empty vectors or non-finite components.
    pub fn new(values: Vec<f32>) -> Result<Self, FaceError> {
        if values.is_empty() {
            return Err(FaceError::InvalidEmbedding("empty vector".to_string()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FaceError::InvalidEmbedding(
                "non-finite component".to_string(),
            ));
        }
        Ok(Self(values))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.0.len()
    }
}

#[async_trait]
pub trait FaceService: Send + Sync {
    /// Validate and decode raw upload bytes.
    async fn decode(&self, bytes: &[u8]) -> Result<FaceImage, FaceError>;

    async fn check_liveness(&self, image: &FaceImage) -> Result<Liveness, FaceError>;

    /// `None` when no face was found or detection confidence was too low.
    async fn embedding(&self, image: &FaceImage) -> Result<Option<Embedding>, FaceError>;

    /// Scores strictly above this value authorize.
    fn similarity_threshold(&self) -> f32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackType {
    BruteForce,
    Replay,
    SessionHijacking,
    Injection,
    Spoofing,
}

impl AttackType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BruteForce => "BRUTE_FORCE",
            Self::Replay => "REPLAY",
            Self::SessionHijacking => "SESSION_HIJACKING",
            Self::Injection => "INJECTION",
            Self::Spoofing => "SPOOFING",
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
}

impl SecurityLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationRequest {
    pub attack_type: AttackType,
    pub target_user: String,
    pub security_level: SecurityLevel,
    pub source_ip: String,
}

/// `success` reports whether the simulated attack got through; `false` means blocked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub success: bool,
    pub message: String,
    pub attack_type: String,
}

impl SimulationOutcome {
    #[must_use]
    pub fn blocked(&self) -> bool {
        !self.success
    }
}

#[async_trait]
pub trait ThreatService: Send + Sync {
    async fn execute_simulation(
        &self,
        request: SimulationRequest,
    ) -> Result<SimulationOutcome, ThreatError>;
}
