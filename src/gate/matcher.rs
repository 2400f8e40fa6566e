//! 1:N nearest-template search and the authorization decision.
//!
//! Linear in gallery size; an ANN index would be needed for large galleries.

use super::identity::GalleryEntry;
use super::services::Embedding;

/// Score reported when nothing is enrolled.
pub const EMPTY_GALLERY_SCORE: f32 = -1.0;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;
pub const DEFAULT_SOFT_MATCH_THRESHOLD: f32 = 0.4;

/// Cosine similarity clamped to [-1, 1]. `None` on dimension mismatch; zero vectors score 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    #[allow(clippy::cast_possible_truncation)]
    let score = (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32;
    Some(score.clamp(-1.0, 1.0))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub username: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchDecision {
    pub best_score: f32,
    pub candidate: Option<Candidate>,
    pub authorized: bool,
}

impl MatchDecision {
    /// Denied, but close enough that the suspected identity should share the blame.
    #[must_use]
    pub fn near_miss(&self, soft_match_threshold: f32) -> Option<&Candidate> {
        if self.authorized || self.best_score <= soft_match_threshold {
            return None;
        }
        self.candidate.as_ref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchDecisionPolicy {
    similarity_threshold: f32,
    soft_match_threshold: f32,
}

impl MatchDecisionPolicy {
    #[must_use]
    pub fn new(similarity_threshold: f32, soft_match_threshold: f32) -> Self {
        Self {
            similarity_threshold,
            soft_match_threshold,
        }
    }

    #[must_use]
    pub fn soft_match_threshold(&self) -> f32 {
        self.soft_match_threshold
    }

    /// Best match for `probe`; authorized only when the score is strictly above the threshold.
    #[must_use]
    pub fn decide(&self, probe: &Embedding, gallery: &[GalleryEntry]) -> MatchDecision {
        let mut best_score = EMPTY_GALLERY_SCORE;
        let mut best: Option<&GalleryEntry> = None;

        for entry in gallery {
            let Some(score) = cosine_similarity(probe.as_slice(), entry.embedding.as_slice())
            else {
                continue;
            };
            // Strict comparison keeps the earliest entry on ties.
            if best.is_none() || score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        let candidate = best.map(|entry| Candidate {
            username: entry.username.clone(),
            role: entry.role.clone(),
        });
        let authorized = candidate.is_some() && best_score > self.similarity_threshold;

        MatchDecision {
            best_score,
            candidate,
            authorized,
        }
    }
}

impl Default for MatchDecisionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_SOFT_MATCH_THRESHOLD)
    }
}
