use super::audit::DEFAULT_AUDIT_CAPACITY;
use super::lockout::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_LOCK_DURATION_SECONDS};
use super::matcher::DEFAULT_SOFT_MATCH_THRESHOLD;
use super::nonce::DEFAULT_NONCE_TTL_SECONDS;

/// Tunables for the security core.
///
/// The authorization threshold is owned by the face service; only the
/// soft-match threshold used for near-miss escalation lives here.
#[derive(Clone, Debug, PartialEq)]
pub struct GateConfig {
    failure_threshold: u32,
    lock_duration_seconds: u64,
    nonce_ttl_seconds: u64,
    soft_match_threshold: f32,
    audit_capacity: usize,
}

impl GateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            lock_duration_seconds: DEFAULT_LOCK_DURATION_SECONDS,
            nonce_ttl_seconds: DEFAULT_NONCE_TTL_SECONDS,
            soft_match_threshold: DEFAULT_SOFT_MATCH_THRESHOLD,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lock_duration_seconds(mut self, seconds: u64) -> Self {
        self.lock_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_nonce_ttl_seconds(mut self, seconds: u64) -> Self {
        self.nonce_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_soft_match_threshold(mut self, threshold: f32) -> Self {
        self.soft_match_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self
    }

    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    #[must_use]
    pub fn lock_duration_seconds(&self) -> u64 {
        self.lock_duration_seconds
    }

    #[must_use]
    pub fn nonce_ttl_seconds(&self) -> u64 {
        self.nonce_ttl_seconds
    }

    #[must_use]
    pub fn soft_match_threshold(&self) -> f32 {
        self.soft_match_threshold
    }

    #[must_use]
    pub fn audit_capacity(&self) -> usize {
        self.audit_capacity
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new()
    }
}
