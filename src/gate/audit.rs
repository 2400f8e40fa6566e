//! Bounded, newest-first audit trail of security events.
//!
//! Flow Overview:
//! 1) Callers describe an event with `NewAuditEvent`; id and timestamp are assigned here.
//! 2) Events are prepended; once the store holds `capacity` entries the oldest is evicted.
//! 3) Metric summaries are recomputed from whatever is retained at request time.
//!
//! The store is volatile: nothing survives a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::clock::Clock;

pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;
pub const SYSTEM_SOURCE: &str = "SYSTEM";

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-type tag. Tags outside the known set (e.g. reported by a client) are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Registration,
    EnrollFace,
    VerifySuccess,
    VerifyFail,
    LivenessFail,
    ReplayAttack,
    SpoofAttempt,
    AuthFailureCount,
    SystemLockdown,
    SystemUnlock,
    ThreatSimulation,
    Other(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registration => "REGISTRATION",
            Self::EnrollFace => "ENROLL_FACE",
            Self::VerifySuccess => "VERIFY_SUCCESS",
            Self::VerifyFail => "VERIFY_FAIL",
            Self::LivenessFail => "LIVENESS_FAIL",
            Self::ReplayAttack => "REPLAY_ATTACK",
            Self::SpoofAttempt => "SPOOF_ATTEMPT",
            Self::AuthFailureCount => "AUTH_FAILURE_COUNT",
            Self::SystemLockdown => "SYSTEM_LOCKDOWN",
            Self::SystemUnlock => "SYSTEM_UNLOCK",
            Self::ThreatSimulation => "THREAT_SIMULATION",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "REGISTRATION" => Self::Registration,
            "ENROLL_FACE" => Self::EnrollFace,
            "VERIFY_SUCCESS" => Self::VerifySuccess,
            "VERIFY_FAIL" => Self::VerifyFail,
            "LIVENESS_FAIL" => Self::LivenessFail,
            "REPLAY_ATTACK" => Self::ReplayAttack,
            "SPOOF_ATTEMPT" => Self::SpoofAttempt,
            "AUTH_FAILURE_COUNT" => Self::AuthFailureCount,
            "SYSTEM_LOCKDOWN" => Self::SystemLockdown,
            "SYSTEM_UNLOCK" => Self::SystemUnlock,
            "THREAT_SIMULATION" => Self::ThreatSimulation,
            _ => Self::Other(tag),
        }
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    #[schema(value_type = String, example = "VERIFY_FAIL")]
    pub event_type: EventType,
    pub username: Option<String>,
    pub source_ip: String,
    pub details: String,
}

/// Event description before the trail stamps it.
#[derive(Clone, Debug)]
pub struct NewAuditEvent {
    event_type: EventType,
    severity: Severity,
    details: String,
    username: Option<String>,
    source_ip: String,
}

impl NewAuditEvent {
    pub fn new(event_type: EventType, severity: Severity, details: impl Into<String>) -> Self {
        Self {
            event_type,
            severity,
            details: details.into(),
            username: None,
            source_ip: SYSTEM_SOURCE.to_string(),
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    #[must_use]
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }
}

/// Counts over the retained audit window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub total_events: usize,
    pub window_capacity: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_event_type: BTreeMap<String, usize>,
    pub verify_success: usize,
    pub verify_fail: usize,
    /// `None` until at least one verification has been decided.
    pub verification_success_rate: Option<f64>,
    pub replay_attacks: usize,
    pub spoof_attempts: usize,
    pub lockdowns: usize,
    pub oldest_event: Option<DateTime<Utc>>,
    pub newest_event: Option<DateTime<Utc>>,
}

pub struct AuditTrail {
    capacity: usize,
    clock: Arc<dyn Clock>,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl AuditTrail {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(clock, DEFAULT_AUDIT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            clock,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn log(&self, new: NewAuditEvent) -> AuditEvent {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            timestamp: self.clock.now(),
            severity: new.severity,
            event_type: new.event_type,
            username: new.username,
            source_ip: new.source_ip,
            details: new.details,
        };

        emit(&event);

        let mut events = self.events.lock().await;
        events.push_front(event.clone());
        events.truncate(self.capacity);

        event
    }

    /// Newest-first, at most `limit` entries.
    pub async fn get(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.lock().await;
        events.iter().take(limit).cloned().collect()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    pub async fn metric_summary(&self) -> MetricSummary {
        let events = self.events.lock().await;

        let mut summary = MetricSummary {
            total_events: events.len(),
            window_capacity: self.capacity,
            newest_event: events.front().map(|event| event.timestamp),
            oldest_event: events.back().map(|event| event.timestamp),
            ..MetricSummary::default()
        };

        for event in events.iter() {
            *summary
                .by_severity
                .entry(event.severity.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_event_type
                .entry(event.event_type.as_str().to_string())
                .or_default() += 1;

            match event.event_type {
                EventType::VerifySuccess => summary.verify_success += 1,
                EventType::VerifyFail => summary.verify_fail += 1,
                EventType::ReplayAttack => summary.replay_attacks += 1,
                EventType::SpoofAttempt | EventType::LivenessFail => summary.spoof_attempts += 1,
                EventType::SystemLockdown => summary.lockdowns += 1,
                _ => {}
            }
        }

        let decided = summary.verify_success + summary.verify_fail;
        if decided > 0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = summary.verify_success as f64 / decided as f64;
            summary.verification_success_rate = Some(rate);
        }

        summary
    }
}

fn emit(event: &AuditEvent) {
    let username = event.username.as_deref().unwrap_or("-");
    match event.severity {
        Severity::Info => info!(
            event_type = %event.event_type,
            username,
            source_ip = %event.source_ip,
            "[AUDIT] {}",
            event.details
        ),
        Severity::Warning => warn!(
            event_type = %event.event_type,
            username,
            source_ip = %event.source_ip,
            "[AUDIT] {}",
            event.details
        ),
        Severity::Critical => error!(
            event_type = %event.event_type,
            username,
            source_ip = %event.source_ip,
            "[AUDIT] {}",
            event.details
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::clock::ManualClock;
    use chrono::Duration;

    fn trail() -> (Arc<ManualClock>, AuditTrail) {
        let clock = Arc::new(ManualClock::default());
        let trail = AuditTrail::new(clock.clone());
        (clock, trail)
    }

    #[tokio::test]
    async fn log_assigns_id_timestamp_and_default_source() {
        let (clock, trail) = trail();
        let event = trail
            .log(NewAuditEvent::new(
                EventType::Registration,
                Severity::Info,
                "New identity created",
            ))
            .await;

        assert_eq!(event.timestamp, clock.now());
        assert_eq!(event.source_ip, SYSTEM_SOURCE);
        assert_eq!(event.username, None);
        assert_eq!(trail.len().await, 1);
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_and_keeps_newest_first() {
        let (clock, trail) = trail();
        let mut first_id = None;
        for index in 0..=DEFAULT_AUDIT_CAPACITY {
            clock.advance(Duration::milliseconds(1));
            let event = trail
                .log(NewAuditEvent::new(
                    EventType::VerifyFail,
                    Severity::Warning,
                    format!("event {index}"),
                ))
                .await;
            if index == 0 {
                first_id = Some(event.id);
            }
        }

        assert_eq!(trail.len().await, DEFAULT_AUDIT_CAPACITY);

        let events = trail.get(DEFAULT_AUDIT_CAPACITY).await;
        assert_eq!(events.len(), DEFAULT_AUDIT_CAPACITY);
        assert_eq!(events[0].details, format!("event {DEFAULT_AUDIT_CAPACITY}"));
        assert_eq!(events[DEFAULT_AUDIT_CAPACITY - 1].details, "event 1");
        assert!(events.iter().all(|event| Some(event.id) != first_id));
        assert!(
            events
                .windows(2)
                .all(|pair| pair[0].timestamp > pair[1].timestamp)
        );
    }

    #[tokio::test]
    async fn get_honours_limit() {
        let (_clock, trail) = trail();
        for _ in 0..5 {
            trail
                .log(NewAuditEvent::new(EventType::VerifySuccess, Severity::Info, "ok"))
                .await;
        }
        assert_eq!(trail.get(3).await.len(), 3);
        assert_eq!(trail.get(100).await.len(), 5);
    }

    #[tokio::test]
    async fn metric_summary_counts_retained_window() {
        let (_clock, trail) = trail();
        assert_eq!(trail.metric_summary().await.verification_success_rate, None);

        for new in [
            NewAuditEvent::new(EventType::VerifySuccess, Severity::Info, "granted"),
            NewAuditEvent::new(EventType::VerifyFail, Severity::Warning, "denied"),
            NewAuditEvent::new(EventType::VerifyFail, Severity::Warning, "denied"),
            NewAuditEvent::new(EventType::VerifySuccess, Severity::Info, "granted"),
            NewAuditEvent::new(EventType::ReplayAttack, Severity::Critical, "replay"),
            NewAuditEvent::new(EventType::SpoofAttempt, Severity::Warning, "spoof"),
            NewAuditEvent::new(EventType::SystemLockdown, Severity::Critical, "lock"),
            NewAuditEvent::new(
                EventType::Other("WEBAUTHN_LOGIN".to_string()),
                Severity::Info,
                "passkey",
            ),
        ] {
            trail.log(new).await;
        }

        let summary = trail.metric_summary().await;
        assert_eq!(summary.total_events, 8);
        assert_eq!(summary.verify_success, 2);
        assert_eq!(summary.verify_fail, 2);
        assert_eq!(summary.verification_success_rate, Some(0.5));
        assert_eq!(summary.replay_attacks, 1);
        assert_eq!(summary.spoof_attempts, 1);
        assert_eq!(summary.lockdowns, 1);
        assert_eq!(summary.by_severity.get("CRITICAL"), Some(&2));
        assert_eq!(summary.by_event_type.get("WEBAUTHN_LOGIN"), Some(&1));
    }

    #[test]
    fn event_type_round_trips_known_and_custom_tags() -> Result<(), serde_json::Error> {
        let known: EventType = serde_json::from_str("\"REPLAY_ATTACK\"")?;
        assert_eq!(known, EventType::ReplayAttack);

        let custom: EventType = serde_json::from_str("\"WEBAUTHN_LOGIN\"")?;
        assert_eq!(custom, EventType::Other("WEBAUTHN_LOGIN".to_string()));
        assert_eq!(serde_json::to_string(&custom)?, "\"WEBAUTHN_LOGIN\"");
        Ok(())
    }

    #[test]
    fn audit_event_uses_camel_case_fields() -> Result<(), serde_json::Error> {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            severity: Severity::Warning,
            event_type: EventType::VerifyFail,
            username: None,
            source_ip: "10.0.0.1".to_string(),
            details: "Face mismatch".to_string(),
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["eventType"], "VERIFY_FAIL");
        assert_eq!(value["sourceIp"], "10.0.0.1");
        assert_eq!(value["severity"], "WARNING");
        Ok(())
    }
}
