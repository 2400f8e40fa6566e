use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;
use clap::ArgMatches;
use tracing::{debug, Level};

/// Tracing level for a `-v` count; `None` keeps the ERROR default.
const fn verbosity_level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

fn requested_level(matches: &ArgMatches) -> Option<Level> {
    verbosity_level(
        matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or(0),
    )
}

/// Parse the command line, bring up logging and resolve the gateway action.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialized or the gateway options are invalid.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();
    let level = requested_level(&matches);

    telemetry::init(level)?;

    let action = dispatch::handler(&matches)?;
    debug!(
        action = action.name(),
        level = %level.unwrap_or(Level::ERROR),
        "biogate configured"
    );
    Ok(action)
}
