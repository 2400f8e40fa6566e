//! Register, enroll, verify and simulate flows over the shared security state.
//!
//! Verify Flow Overview (terminal at the first branch that applies):
//! 1) Active lock: reject with `SystemLocked`, no audit entry, no bookkeeping.
//! 2) Nonce missing/used/expired: engage the lock, log `REPLAY_ATTACK`, reject.
//! 3) Liveness failure: count against the source IP, log `SPOOF_ATTEMPT`, soft denial.
//! 4) No embedding: soft denial without bookkeeping.
//! 5) Match the probe against the gallery snapshot.
//! 6) Grant (reset IP and user counters) or deny (count IP, plus the suspected
//!    user on a near miss).
//!
//! No gateway mutex is held while the face or threat service is awaited.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::audit::{AuditEvent, AuditTrail, EventType, MetricSummary, NewAuditEvent, Severity};
use super::clock::{Clock, seconds};
use super::config::GateConfig;
use super::error::GateError;
use super::identity::{IdentityRegistry, PublicIdentity};
use super::lockout::{LockStatus, LockoutStateMachine};
use super::matcher::MatchDecisionPolicy;
use super::nonce::{Challenge, NonceRegistry};
use super::services::{
    AttackType, FaceService, SecurityLevel, SimulationRequest, ThreatService,
};

pub const REPLAY_LOCK_REASON: &str = "replay attack detected";
pub const DEFAULT_LOG_LIMIT: usize = 100;
/// Client-reported details longer than this are cut at a char boundary.
pub const MAX_EXTERNAL_DETAILS_CHARS: usize = 1024;
/// Cap for client-reported usernames and unknown event tags.
pub const MAX_EXTERNAL_FIELD_CHARS: usize = 64;

/// Public fields of the matched identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MatchedUser {
    pub username: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationOutcome {
    pub authorized: bool,
    pub similarity: f32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<MatchedUser>,
}

impl VerificationOutcome {
    fn denied(similarity: f32, message: impl Into<String>) -> Self {
        Self {
            authorized: false,
            similarity,
            message: message.into(),
            user: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Whether the simulated attack got through.
    pub success: bool,
    pub message: String,
    pub attack_type: String,
    pub blocked_by_lock: bool,
    pub lock_triggered: bool,
}

/// Event reported by a trusted client. Any client-supplied `sourceIp` is ignored.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvent {
    #[schema(value_type = String, example = "WEBAUTHN_LOGIN")]
    pub event_type: EventType,
    pub severity: Severity,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
}

pub struct VerificationOrchestrator {
    audit: Arc<AuditTrail>,
    nonces: NonceRegistry,
    lockout: LockoutStateMachine,
    identities: IdentityRegistry,
    soft_match_threshold: f32,
    face: Arc<dyn FaceService>,
    threats: Arc<dyn ThreatService>,
}

impl VerificationOrchestrator {
    #[must_use]
    pub fn new(
        config: &GateConfig,
        face: Arc<dyn FaceService>,
        threats: Arc<dyn ThreatService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let audit = Arc::new(AuditTrail::with_capacity(
            clock.clone(),
            config.audit_capacity(),
        ));
        let lockout = LockoutStateMachine::new(
            config.failure_threshold(),
            seconds(config.lock_duration_seconds()),
            clock.clone(),
            audit.clone(),
        );

        Self {
            nonces: NonceRegistry::new(clock.clone(), seconds(config.nonce_ttl_seconds())),
            identities: IdentityRegistry::new(clock),
            lockout,
            audit,
            soft_match_threshold: config.soft_match_threshold(),
            face,
            threats,
        }
    }

    #[must_use]
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    #[must_use]
    pub fn lockout(&self) -> &LockoutStateMachine {
        &self.lockout
    }

    #[must_use]
    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    #[must_use]
    pub fn policy(&self) -> MatchDecisionPolicy {
        MatchDecisionPolicy::new(self.face.similarity_threshold(), self.soft_match_threshold)
    }

    pub async fn issue_challenge(&self) -> Challenge {
        self.nonces.issue().await
    }

    /// # Errors
    /// Validation failures or `UsernameTaken`.
    #[instrument(skip(self))]
    pub async fn register(
        &self,
        username: &str,
        role: &str,
        source_ip: &str,
    ) -> Result<PublicIdentity, GateError> {
        let identity = self.identities.register(username, role).await?;

        self.audit
            .log(
                NewAuditEvent::new(
                    EventType::Registration,
                    Severity::Info,
                    format!(
                        "New identity created: {} ({})",
                        identity.username, identity.role
                    ),
                )
                .with_username(Some(identity.username.clone()))
                .with_source_ip(source_ip),
            )
            .await;

        Ok(identity.public())
    }

    /// Bind a face template to an existing identity.
    ///
    /// # Errors
    /// `UnknownUser`, `InvalidImage`, `LivenessRejected`, `NoFaceDetected` or a
    /// face service failure.
    #[instrument(skip(self, image), fields(image_len = image.len()))]
    pub async fn enroll(
        &self,
        username: &str,
        image: &[u8],
        source_ip: &str,
    ) -> Result<EnrollmentOutcome, GateError> {
        let username = username.trim();
        if self.identities.find(username).await.is_none() {
            return Err(GateError::UnknownUser);
        }

        let decoded = self.face.decode(image).await?;

        let liveness = self.face.check_liveness(&decoded).await?;
        if !liveness.is_live {
            self.lockout.record_failure(source_ip, source_ip).await;
            self.audit
                .log(
                    NewAuditEvent::new(
                        EventType::LivenessFail,
                        Severity::Warning,
                        format!("Enrollment rejected: {}", liveness.reason),
                    )
                    .with_username(Some(username.to_string()))
                    .with_source_ip(source_ip),
                )
                .await;
            return Err(GateError::LivenessRejected {
                reason: liveness.reason,
            });
        }

        let embedding = self
            .face
            .embedding(&decoded)
            .await?
            .ok_or(GateError::NoFaceDetected)?;

        self.identities.enroll(username, embedding).await?;

        self.audit
            .log(
                NewAuditEvent::new(
                    EventType::EnrollFace,
                    Severity::Info,
                    "Biometric face template bound to identity",
                )
                .with_username(Some(username.to_string()))
                .with_source_ip(source_ip),
            )
            .await;

        Ok(EnrollmentOutcome {
            success: true,
            message: format!("User {username} enrolled successfully."),
        })
    }

    /// 1:N verification of a capture bound to a challenge nonce.
    ///
    /// # Errors
    /// `SystemLocked`, `InvalidChallenge`, `InvalidImage` or a face service failure.
    /// Denials are returned as `Ok` with `authorized = false`.
    #[instrument(skip(self, image, nonce), fields(image_len = image.len()))]
    pub async fn verify(
        &self,
        image: &[u8],
        nonce: &str,
        source_ip: &str,
    ) -> Result<VerificationOutcome, GateError> {
        let status = self.lockout.check_lock().await;
        if status.locked {
            return Err(GateError::SystemLocked {
                remaining_seconds: status.remaining_seconds,
            });
        }

        if self.nonces.consume_and_validate(nonce).await.is_err() {
            self.lockout
                .trigger_lock(REPLAY_LOCK_REASON, source_ip)
                .await;
            self.audit
                .log(
                    NewAuditEvent::new(
                        EventType::ReplayAttack,
                        Severity::Critical,
                        "Invalid or expired nonce used",
                    )
                    .with_source_ip(source_ip),
                )
                .await;
            return Err(GateError::InvalidChallenge);
        }

        let decoded = self.face.decode(image).await?;

        let liveness = self.face.check_liveness(&decoded).await?;
        if !liveness.is_live {
            self.lockout.record_failure(source_ip, source_ip).await;
            self.audit
                .log(
                    NewAuditEvent::new(
                        EventType::SpoofAttempt,
                        Severity::Warning,
                        format!("Liveness check failed during verify: {}", liveness.reason),
                    )
                    .with_source_ip(source_ip),
                )
                .await;
            return Ok(VerificationOutcome::denied(
                0.0,
                format!("Liveness Check Failed: {}", liveness.reason),
            ));
        }

        let Some(probe) = self.face.embedding(&decoded).await? else {
            debug!("No face detected in verification capture");
            return Ok(VerificationOutcome::denied(0.0, "No face detected"));
        };

        let gallery = self.identities.gallery().await;
        let policy = self.policy();
        let decision = policy.decide(&probe, &gallery);

        if decision.authorized {
            if let Some(candidate) = decision.candidate {
                self.lockout.reset_failure(source_ip).await;
                self.lockout.reset_failure(&candidate.username).await;
                self.audit
                    .log(
                        NewAuditEvent::new(
                            EventType::VerifySuccess,
                            Severity::Info,
                            format!("Access Granted (Score: {:.4})", decision.best_score),
                        )
                        .with_username(Some(candidate.username.clone()))
                        .with_source_ip(source_ip),
                    )
                    .await;
                info!(
                    username = %candidate.username,
                    score = decision.best_score,
                    "Access granted"
                );

                return Ok(VerificationOutcome {
                    authorized: true,
                    similarity: decision.best_score,
                    message: format!("Welcome, {}", candidate.username),
                    user: Some(MatchedUser {
                        username: candidate.username,
                        role: candidate.role,
                    }),
                });
            }
        }

        self.lockout.record_failure(source_ip, source_ip).await;
        let suspected = decision
            .near_miss(policy.soft_match_threshold())
            .map(|candidate| candidate.username.clone());
        if let Some(username) = &suspected {
            self.lockout.record_failure(username, source_ip).await;
        }

        self.audit
            .log(
                NewAuditEvent::new(
                    EventType::VerifyFail,
                    Severity::Warning,
                    format!("Face mismatch. Best Score: {:.4}", decision.best_score),
                )
                .with_username(suspected)
                .with_source_ip(source_ip),
            )
            .await;

        Ok(VerificationOutcome::denied(
            decision.best_score,
            "Access Denied: Face not recognized",
        ))
    }

    /// Run a threat simulation; a blocked attack at `HIGH` engages the real lock.
    ///
    /// # Errors
    /// Returns `GateError::ThreatService` if the simulator fails.
    #[instrument(skip(self))]
    pub async fn simulate(
        &self,
        attack_type: AttackType,
        target_user: &str,
        security_level: SecurityLevel,
        source_ip: &str,
    ) -> Result<SimulationReport, GateError> {
        let status = self.lockout.check_lock().await;
        if status.locked {
            return Ok(SimulationReport {
                success: false,
                message: format!(
                    "Blocked by active system lock ({}s remaining)",
                    status.remaining_seconds
                ),
                attack_type: attack_type.to_string(),
                blocked_by_lock: true,
                lock_triggered: false,
            });
        }

        let outcome = self
            .threats
            .execute_simulation(SimulationRequest {
                attack_type,
                target_user: target_user.to_string(),
                security_level,
                source_ip: source_ip.to_string(),
            })
            .await?;

        let severity = if outcome.blocked() {
            Severity::Info
        } else {
            Severity::Warning
        };
        let target = Some(target_user.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self.audit
            .log(
                NewAuditEvent::new(
                    EventType::ThreatSimulation,
                    severity,
                    format!(
                        "{} simulation at {security_level}: {}",
                        outcome.attack_type, outcome.message
                    ),
                )
                .with_username(target)
                .with_source_ip(source_ip),
            )
            .await;

        let lock_triggered = outcome.blocked() && security_level == SecurityLevel::High;
        if lock_triggered {
            let reason = format!(
                "simulated {} attack blocked at HIGH security",
                outcome.attack_type
            );
            self.lockout.trigger_lock(&reason, source_ip).await;
        }

        Ok(SimulationReport {
            success: outcome.success,
            message: outcome.message,
            attack_type: outcome.attack_type,
            blocked_by_lock: false,
            lock_triggered,
        })
    }

    /// Record a client-reported event under the resolved connection IP.
    pub async fn ingest_external(&self, event: ExternalEvent, resolved_ip: &str) -> AuditEvent {
        if let Some(claimed) = event.source_ip.as_deref() {
            if claimed != resolved_ip {
                debug!(claimed, resolved_ip, "Ignoring client-supplied source IP");
            }
        }

        let event_type = match event.event_type {
            EventType::Other(tag) => EventType::Other(clip(tag, MAX_EXTERNAL_FIELD_CHARS)),
            known => known,
        };
        let details = clip(event.details, MAX_EXTERNAL_DETAILS_CHARS);
        let username = event
            .username
            .map(|name| clip(name, MAX_EXTERNAL_FIELD_CHARS));

        self.audit
            .log(
                NewAuditEvent::new(event_type, event.severity, details)
                    .with_username(username)
                    .with_source_ip(resolved_ip),
            )
            .await
    }

    pub async fn lock_status(&self) -> LockStatus {
        self.lockout.check_lock().await
    }

    pub async fn audit_log(&self, limit: usize) -> Vec<AuditEvent> {
        self.audit.get(limit.min(self.audit.capacity())).await
    }

    pub async fn metrics(&self) -> MetricSummary {
        self.audit.metric_summary().await
    }
}

fn clip(mut value: String, max_chars: usize) -> String {
    if let Some((end, _)) = value.char_indices().nth(max_chars) {
        value.truncate(end);
    }
    value
}
