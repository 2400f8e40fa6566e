use crate::gate::GateConfig;
use clap::{Arg, ArgMatches, Command};

pub const ARG_SOFT_MATCH_THRESHOLD: &str = "soft-match-threshold";
pub const ARG_LOCKOUT_THRESHOLD: &str = "lockout-threshold";
pub const ARG_LOCKOUT_DURATION: &str = "lockout-duration-seconds";
pub const ARG_NONCE_TTL: &str = "nonce-ttl-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub soft_match_threshold: f32,
    pub lockout_threshold: u32,
    pub lockout_duration_seconds: u64,
    pub nonce_ttl_seconds: u64,
}

impl Options {
    /// Parse security core arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a threshold falls outside its range or a duration is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let defaults = GateConfig::default();

        let soft_match_threshold = matches
            .get_one::<f32>(ARG_SOFT_MATCH_THRESHOLD)
            .copied()
            .unwrap_or_else(|| defaults.soft_match_threshold());
        super::ensure_unit_range(ARG_SOFT_MATCH_THRESHOLD, soft_match_threshold)?;

        let lockout_threshold = matches
            .get_one::<u32>(ARG_LOCKOUT_THRESHOLD)
            .copied()
            .unwrap_or_else(|| defaults.failure_threshold());
        if lockout_threshold == 0 {
            anyhow::bail!("--{ARG_LOCKOUT_THRESHOLD} must be greater than 0");
        }

        let lockout_duration_seconds = positive(
            ARG_LOCKOUT_DURATION,
            matches.get_one::<u64>(ARG_LOCKOUT_DURATION).copied(),
            defaults.lock_duration_seconds(),
        )?;
        let nonce_ttl_seconds = positive(
            ARG_NONCE_TTL,
            matches.get_one::<u64>(ARG_NONCE_TTL).copied(),
            defaults.nonce_ttl_seconds(),
        )?;

        Ok(Self {
            soft_match_threshold,
            lockout_threshold,
            lockout_duration_seconds,
            nonce_ttl_seconds,
        })
    }

    #[must_use]
    pub fn config(&self) -> GateConfig {
        GateConfig::new()
            .with_soft_match_threshold(self.soft_match_threshold)
            .with_failure_threshold(self.lockout_threshold)
            .with_lock_duration_seconds(self.lockout_duration_seconds)
            .with_nonce_ttl_seconds(self.nonce_ttl_seconds)
    }
}

fn positive(name: &str, value: Option<u64>, default: u64) -> anyhow::Result<u64> {
    let value = value.unwrap_or(default);
    if value == 0 {
        anyhow::bail!("--{name} must be greater than 0");
    }
    Ok(value)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SOFT_MATCH_THRESHOLD)
                .long(ARG_SOFT_MATCH_THRESHOLD)
                .help("Score above which a rejected face charges the closest identity a failure")
                .env("BIOGATE_SOFT_MATCH_THRESHOLD")
                .default_value("0.4")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_THRESHOLD)
                .long(ARG_LOCKOUT_THRESHOLD)
                .help("Failures per client before the system locks")
                .env("BIOGATE_LOCKOUT_THRESHOLD")
                .default_value("3")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_DURATION)
                .long(ARG_LOCKOUT_DURATION)
                .help("Lock duration in seconds")
                .env("BIOGATE_LOCKOUT_DURATION_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_NONCE_TTL)
                .long(ARG_NONCE_TTL)
                .help("Challenge nonce TTL in seconds")
                .env("BIOGATE_NONCE_TTL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}
