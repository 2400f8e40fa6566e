//! API handlers and shared request plumbing.
//!
//! Handlers stay thin: they extract the caller IP and body, delegate to the
//! `VerificationOrchestrator`, and map `GateError` onto HTTP statuses.

pub mod auth;
pub mod client_ip;
pub mod error;
pub mod form;
pub mod health;
pub mod monitor;
pub mod root;

pub use self::error::{ApiError, ErrorDetail};

#[cfg(test)]
mod tests;
