//! Single-use challenge tokens guarding verification against replay.
//!
//! Expired entries are purged opportunistically on `issue`; correctness does not
//! depend on that sweep because `consume_and_validate` checks the age itself.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use super::clock::Clock;

pub const DEFAULT_NONCE_TTL_SECONDS: u64 = 60;

/// Absent, already consumed and expired tokens all map here: each is a replay signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired challenge")]
pub struct InvalidOrExpiredChallenge;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Challenge {
    pub nonce: String,
    /// Issue time in fractional seconds since the Unix epoch.
    pub timestamp: f64,
}

pub struct NonceRegistry {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    issued: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NonceRegistry {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            ttl,
            clock,
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub async fn issue(&self) -> Challenge {
        let nonce = Uuid::new_v4().to_string();
        let now = self.clock.now();

        let mut issued = self.issued.lock().await;
        let before = issued.len();
        issued.retain(|_, issued_at| now - *issued_at <= self.ttl);
        let purged = before - issued.len();
        if purged > 0 {
            debug!(purged, "Purged expired challenges");
        }
        issued.insert(nonce.clone(), now);

        #[allow(clippy::cast_precision_loss)]
        let timestamp = now.timestamp_millis() as f64 / 1000.0;
        Challenge { nonce, timestamp }
    }

    /// Remove `token` and accept it if it was issued within the TTL.
    ///
    /// # Errors
    /// Returns `InvalidOrExpiredChallenge` when the token is unknown, already used or expired.
    pub async fn consume_and_validate(&self, token: &str) -> Result<(), InvalidOrExpiredChallenge> {
        let now = self.clock.now();
        let mut issued = self.issued.lock().await;
        match issued.remove(token) {
            Some(issued_at) if now - issued_at <= self.ttl => Ok(()),
            _ => Err(InvalidOrExpiredChallenge),
        }
    }

    /// Outstanding tokens, including expired ones not yet purged.
    pub async fn pending(&self) -> usize {
        self.issued.lock().await.len()
    }
}
