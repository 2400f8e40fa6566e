//! Challenge, registration, enrollment and verification endpoints.

pub mod challenge;
pub mod enroll;
pub mod register;
pub mod verify;
