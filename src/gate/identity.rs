//! Volatile identity store and enrollment gallery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;

use super::clock::Clock;
use super::error::GateError;
use super::services::Embedding;

const MAX_USERNAME_LEN: usize = 64;
const MAX_ROLE_LEN: usize = 64;

/// Biometric template bound to an identity.
#[derive(Clone, Debug, PartialEq)]
pub enum Template {
    Unenrolled,
    Enrolled {
        embedding: Embedding,
        enrolled_at: DateTime<Utc>,
        /// Position in enrollment order; ties in matching resolve to the lower value.
        sequence: u64,
    },
}

#[derive(Clone, Debug)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub template: Template,
}

impl Identity {
    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        matches!(self.template, Template::Enrolled { .. })
    }

    #[must_use]
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id,
            username: self.username.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
            enrolled: self.is_enrolled(),
        }
    }
}

/// Identity fields safe to return to clients; the template never leaves the process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub enrolled: bool,
}

/// One enrolled template as seen by the matcher.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryEntry {
    pub username: String,
    pub role: String,
    pub embedding: Embedding,
}

struct Registry {
    identities: Vec<Identity>,
    next_sequence: u64,
}

pub struct IdentityRegistry {
    clock: Arc<dyn Clock>,
    inner: Mutex<Registry>,
}

/// Usernames are trimmed and limited to `[A-Za-z0-9_.-]{1,64}`.
///
/// # Errors
/// Returns `GateError::InvalidUsername` for anything else.
pub fn normalize_username(username: &str) -> Result<String, GateError> {
    let trimmed = username.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_USERNAME_LEN
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'));
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(GateError::InvalidUsername)
    }
}

fn normalize_role(role: &str) -> Result<String, GateError> {
    let trimmed = role.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_ROLE_LEN {
        Err(GateError::InvalidRole)
    } else {
        Ok(trimmed.to_string())
    }
}

impl IdentityRegistry {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Registry {
                identities: Vec::new(),
                next_sequence: 0,
            }),
        }
    }

    /// Create an unenrolled identity.
    ///
    /// # Errors
    /// `InvalidUsername`/`InvalidRole` for malformed input, `UsernameTaken` on duplicates.
    pub async fn register(&self, username: &str, role: &str) -> Result<Identity, GateError> {
        let username = normalize_username(username)?;
        let role = normalize_role(role)?;

        let mut inner = self.inner.lock().await;
        if inner.identities.iter().any(|i| i.username == username) {
            return Err(GateError::UsernameTaken);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            username,
            role,
            created_at: self.clock.now(),
            template: Template::Unenrolled,
        };
        inner.identities.push(identity.clone());
        Ok(identity)
    }

    pub async fn find(&self, username: &str) -> Option<Identity> {
        let inner = self.inner.lock().await;
        inner
            .identities
            .iter()
            .find(|i| i.username == username)
            .cloned()
    }

    /// Bind `embedding` to `username`, replacing any earlier template.
    ///
    /// # Errors
    /// Returns `GateError::UnknownUser` if the identity does not exist.
    pub async fn enroll(
        &self,
        username: &str,
        embedding: Embedding,
    ) -> Result<Identity, GateError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;
        let sequence = inner.next_sequence;

        let identity = inner
            .identities
            .iter_mut()
            .find(|i| i.username == username)
            .ok_or(GateError::UnknownUser)?;
        identity.template = Template::Enrolled {
            embedding,
            enrolled_at: now,
            sequence,
        };
        let enrolled = identity.clone();

        inner.next_sequence += 1;
        Ok(enrolled)
    }

    /// Enrolled templates in enrollment order.
    pub async fn gallery(&self) -> Vec<GalleryEntry> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<(u64, GalleryEntry)> = inner
            .identities
            .iter()
            .filter_map(|identity| match &identity.template {
                Template::Enrolled {
                    embedding,
                    sequence,
                    ..
                } => Some((
                    *sequence,
                    GalleryEntry {
                        username: identity.username.clone(),
                        role: identity.role.clone(),
                        embedding: embedding.clone(),
                    },
                )),
                Template::Unenrolled => None,
            })
            .collect();
        drop(inner);

        entries.sort_by_key(|(sequence, _)| *sequence);
        entries.into_iter().map(|(_, entry)| entry).collect()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.identities.len()
    }

    pub async fn enrolled_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.identities.iter().filter(|i| i.is_enrolled()).count()
    }
}
