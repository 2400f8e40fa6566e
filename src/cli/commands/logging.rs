use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Names accepted by `BIOGATE_LOG_LEVEL`, indexed by verbosity count.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Map a `BIOGATE_LOG_LEVEL` value to a verbosity count.
///
/// Accepts a level name (any case) or a count up to 5.
///
/// # Errors
/// Returns the list of accepted names when the value is neither.
pub fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    if let Ok(count) = level.parse::<u8>() {
        if count <= 5 {
            return Ok(count);
        }
    }

    LOG_LEVELS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(level))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "invalid log level '{level}', expected 0-5 or one of: {}",
                LOG_LEVELS.join(", ")
            )
        })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity; audit decisions are logged at INFO, WARN and ERROR")
            .long_help(
                "Log verbosity. Repeat -v to raise it (-vv shows every audit event) \
                 or set BIOGATE_LOG_LEVEL to a level name. Defaults to ERROR, which \
                 still reports critical events such as lockdowns and replays.",
            )
            .env("BIOGATE_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
