use crate::{
    api,
    face::{FaceServiceConfig, RemoteFaceService},
    gate::{GateConfig, SystemClock, VerificationOrchestrator},
    threat::ThreatSimulator,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub face: FaceServiceConfig,
    pub gate: GateConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the face service client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(face = ?args.face, gate = ?args.gate, "server configuration");

    let face = RemoteFaceService::new(&args.face)
        .with_context(|| format!("Failed to configure face service: {}", args.face.url))?;

    let gate = Arc::new(VerificationOrchestrator::new(
        &args.gate,
        Arc::new(face),
        Arc::new(ThreatSimulator),
        Arc::new(SystemClock),
    ));

    info!(
        face_service = %args.face.url,
        lockout_threshold = args.gate.failure_threshold(),
        "starting biogate"
    );

    api::new(args.port, gate).await
}
