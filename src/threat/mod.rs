//! Deterministic threat simulator.
//!
//! The verdict depends only on the attack type and the requested security
//! level, so a simulation never touches real credentials or identities.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::gate::services::{
    AttackType, SecurityLevel, SimulationOutcome, SimulationRequest, ThreatError, ThreatService,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreatSimulator;

/// Weakest level at which the gateway stops `attack`.
#[must_use]
pub const fn minimum_blocking_level(attack: AttackType) -> SecurityLevel {
    match attack {
        // nonces are single use at every level
        AttackType::Replay => SecurityLevel::Low,
        AttackType::BruteForce | AttackType::Injection => SecurityLevel::Medium,
        AttackType::SessionHijacking | AttackType::Spoofing => SecurityLevel::High,
    }
}

const fn countermeasure(attack: AttackType) -> &'static str {
    match attack {
        AttackType::BruteForce => "consecutive failure lockout",
        AttackType::Replay => "single-use challenge nonce",
        AttackType::SessionHijacking => "per-request challenge binding",
        AttackType::Injection => "strict input validation",
        AttackType::Spoofing => "liveness verification",
    }
}

impl ThreatSimulator {
    #[must_use]
    pub fn simulate(request: &SimulationRequest) -> SimulationOutcome {
        let attack = request.attack_type;
        let blocked = request.security_level >= minimum_blocking_level(attack);

        let message = if blocked {
            format!(
                "{attack} attack against '{}' blocked by {}",
                request.target_user,
                countermeasure(attack)
            )
        } else {
            format!(
                "{attack} attack against '{}' succeeded at {} security",
                request.target_user, request.security_level
            )
        };

        SimulationOutcome {
            success: !blocked,
            message,
            attack_type: attack.to_string(),
        }
    }
}

#[async_trait]
impl ThreatService for ThreatSimulator {
    #[instrument(skip(self))]
    async fn execute_simulation(
        &self,
        request: SimulationRequest,
    ) -> Result<SimulationOutcome, ThreatError> {
        let outcome = Self::simulate(&request);
        debug!(success = outcome.success, "Simulation finished");
        Ok(outcome)
    }
}
