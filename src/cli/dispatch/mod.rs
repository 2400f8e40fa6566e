//! Command-line argument dispatch.
//!
//! Validated matches are mapped to an action, currently only the API server
//! with its face service and security core configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{face, gate};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8000);

    let face_opts = face::Options::parse(matches)?;
    let gate_opts = gate::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        face: face_opts.config(),
        gate: gate_opts.config(),
    }))
}
