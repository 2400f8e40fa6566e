//! # Biogate (Biometric Access-Control Gateway)
//!
//! `biogate` fronts a face-recognition service with the controls a door or
//! terminal needs before it trusts a match.
//!
//! ## Verification
//!
//! Every verification attempt carries a single-use challenge nonce issued by
//! the gateway. A reused or unknown nonce is treated as a replay: the whole
//! gateway is locked immediately and the attempt is audited as critical.
//!
//! The capture must pass the face service liveness check before it is
//! compared against the enrolled gallery by cosine similarity. A rejected
//! face whose best score still clears the soft-match threshold is logged
//! against the closest identity, and that username is charged a failure too.
//!
//! ## Lockout
//!
//! Failures are counted per client address and per suspected username.
//! Either counter reaching the threshold locks the gateway as a whole for a
//! fixed window; while locked every caller is refused before any image
//! processing happens.
//!
//! ## Audit
//!
//! All security decisions land in a bounded, in-memory audit trail that backs
//! the monitoring endpoints (`/api/status`, `/api/logs`, `/api/metrics`).
//! External components can append to it through `/api/logs/external`.

pub mod api;
pub mod cli;
pub mod face;
pub mod gate;
pub mod threat;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
