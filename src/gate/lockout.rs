//! Global lockout driven by per-key consecutive-failure counters.
//!
//! Flow Overview:
//! 1) `record_failure` bumps the counter for a key (source IP or username).
//! 2) Reaching the threshold engages the single global lock for `lock_duration`.
//! 3) Engaging the lock clears every key's counter, not just the one that tripped it.
//! 4) Expiry is lazy: the first observer past the deadline performs LOCKED -> UNLOCKED.
//!
//! Counters and lock state share one mutex, so increment/threshold/trigger and the
//! expiry transition each run as a single critical section. Lock order is
//! lockout -> audit; the audit trail never calls back into this module.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::audit::{AuditTrail, EventType, NewAuditEvent, Severity};
use super::clock::{Clock, saturating_add};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_LOCK_DURATION_SECONDS: u64 = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        expires_at: DateTime<Utc>,
        reason: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LockStatus {
    pub locked: bool,
    /// Whole seconds until the lock lapses, rounded up. Never 0 while `locked`.
    #[serde(rename = "remaining")]
    pub remaining_seconds: u64,
}

impl LockStatus {
    const UNLOCKED: Self = Self {
        locked: false,
        remaining_seconds: 0,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailureRecord {
    pub count: u32,
    pub lock_triggered: bool,
}

struct Inner {
    state: LockState,
    failures: HashMap<String, u32>,
}

pub struct LockoutStateMachine {
    threshold: u32,
    lock_duration: Duration,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditTrail>,
    inner: Mutex<Inner>,
}

impl LockoutStateMachine {
    #[must_use]
    pub fn new(
        threshold: u32,
        lock_duration: Duration,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            threshold: threshold.max(1),
            lock_duration,
            clock,
            audit,
            inner: Mutex::new(Inner {
                state: LockState::Unlocked,
                failures: HashMap::new(),
            }),
        }
    }

    /// Report the lock, unlocking first if the deadline has passed.
    pub async fn check_lock(&self) -> LockStatus {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        self.observe_expiry(&mut inner, now).await;

        match &inner.state {
            LockState::Unlocked => LockStatus::UNLOCKED,
            LockState::Locked { expires_at, .. } => LockStatus {
                locked: true,
                remaining_seconds: remaining_seconds(*expires_at, now),
            },
        }
    }

    /// Snapshot of the current state without performing the expiry transition.
    #[cfg(test)]
    pub(crate) async fn state(&self) -> LockState {
        self.inner.lock().await.state.clone()
    }

    /// Engage (or extend) the global lock.
    #[instrument(skip(self))]
    pub async fn trigger_lock(&self, reason: &str, source_ip: &str) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        self.engage(&mut inner, reason, source_ip, now).await;
    }

    /// Count a failure against `key`; engages the lock when the threshold is reached.
    ///
    /// Returns `None` for an empty key.
    #[instrument(skip(self))]
    pub async fn record_failure(&self, key: &str, source_ip: &str) -> Option<FailureRecord> {
        if key.is_empty() {
            return None;
        }

        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        self.observe_expiry(&mut inner, now).await;

        let count = {
            let counter = inner.failures.entry(key.to_string()).or_insert(0);
            *counter = counter.saturating_add(1);
            *counter
        };

        self.audit
            .log(
                NewAuditEvent::new(
                    EventType::AuthFailureCount,
                    Severity::Warning,
                    format!(
                        "Consecutive failure {count}/{} for {key}",
                        self.threshold
                    ),
                )
                .with_username((key != source_ip).then(|| key.to_string()))
                .with_source_ip(source_ip),
            )
            .await;

        let lock_triggered = count >= self.threshold;
        if lock_triggered {
            let reason = format!("{count} consecutive failures for {key}");
            self.engage(&mut inner, &reason, source_ip, now).await;
        }

        Some(FailureRecord {
            count,
            lock_triggered,
        })
    }

    /// Forget `key`'s counter; the next failure starts again at 1.
    pub async fn reset_failure(&self, key: &str) -> bool {
        let removed = self.inner.lock().await.failures.remove(key).is_some();
        if removed {
            debug!(key, "Failure counter reset");
        }
        removed
    }

    /// `None` when no failures are on record for `key`.
    pub async fn failure_count(&self, key: &str) -> Option<u32> {
        self.inner.lock().await.failures.get(key).copied()
    }

    async fn engage(&self, inner: &mut Inner, reason: &str, source_ip: &str, now: DateTime<Utc>) {
        let expires_at = saturating_add(now, self.lock_duration);
        let cleared = inner.failures.len();
        inner.failures.clear();
        inner.state = LockState::Locked {
            expires_at,
            reason: reason.to_string(),
        };

        debug!(cleared, %expires_at, "Global lock engaged");

        self.audit
            .log(
                NewAuditEvent::new(
                    EventType::SystemLockdown,
                    Severity::Critical,
                    format!(
                        "System locked for {}s: {reason}",
                        self.lock_duration.num_seconds()
                    ),
                )
                .with_source_ip(source_ip),
            )
            .await;
    }

    /// LOCKED -> UNLOCKED once `now` is past the deadline. Callers hold the state
    /// mutex, so only the first observer sees the stale lock and logs the unlock.
    async fn observe_expiry(&self, inner: &mut Inner, now: DateTime<Utc>) {
        let expired = matches!(
            &inner.state,
            LockState::Locked { expires_at, .. } if now > *expires_at
        );
        if !expired {
            return;
        }

        inner.state = LockState::Unlocked;
        inner.failures.clear();

        self.audit
            .log(NewAuditEvent::new(
                EventType::SystemUnlock,
                Severity::Info,
                "Lockout period elapsed; system unlocked",
            ))
            .await;
    }
}

// Floored at 1: at `now == expires_at` the lock still holds.
fn remaining_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (expires_at - now).num_milliseconds().max(0);
    let whole = millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) > 0);
    u64::try_from(whole).unwrap_or(0).max(1)
}
