//! Security dashboard endpoints: lock status, audit trail, metrics and threat simulation.

pub mod logs;
pub mod metrics;
pub mod status;
pub mod threat_sim;
