//! Security core: challenges, lockout, identities, matching and the audit trail.

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod lockout;
pub mod matcher;
pub mod nonce;
pub mod orchestrator;
pub mod services;
#[cfg(test)]
pub(crate) mod test_support;

pub use audit::{AuditEvent, AuditTrail, EventType, MetricSummary, Severity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GateConfig;
pub use error::GateError;
pub use identity::PublicIdentity;
pub use lockout::LockStatus;
pub use nonce::Challenge;
pub use orchestrator::{
    EnrollmentOutcome, ExternalEvent, MatchedUser, SimulationReport, VerificationOrchestrator,
    VerificationOutcome,
};
pub use services::{
    AttackType, Embedding, FaceError, FaceImage, FaceService, ImageFormat, Liveness,
    SecurityLevel, SimulationOutcome, SimulationRequest, ThreatError, ThreatService,
};
