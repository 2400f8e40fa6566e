use crate::face::{endpoint_url, FaceServiceConfig};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_FACE_SERVICE_URL: &str = "face-service-url";
pub const ARG_FACE_SERVICE_TIMEOUT: &str = "face-service-timeout-seconds";
pub const ARG_SIMILARITY_THRESHOLD: &str = "similarity-threshold";
pub const ARG_EMBEDDING_DIM: &str = "embedding-dim";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub timeout_seconds: u64,
    pub similarity_threshold: f32,
    pub embedding_dim: usize,
}

impl Options {
    /// Parse face service arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL is missing or not http(s), the timeout is zero,
    /// or the threshold falls outside `[-1, 1]`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = match matches.get_one::<String>(ARG_FACE_SERVICE_URL).cloned() {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => anyhow::bail!("missing required argument: --{ARG_FACE_SERVICE_URL}"),
        };
        // same resolution the client performs, so a bad URL fails at startup
        endpoint_url(&url, "liveness")?;

        let timeout_seconds = matches
            .get_one::<u64>(ARG_FACE_SERVICE_TIMEOUT)
            .copied()
            .unwrap_or(10);
        if timeout_seconds == 0 {
            anyhow::bail!("--{ARG_FACE_SERVICE_TIMEOUT} must be greater than 0");
        }

        let similarity_threshold = matches
            .get_one::<f32>(ARG_SIMILARITY_THRESHOLD)
            .copied()
            .unwrap_or(0.5);
        super::ensure_unit_range(ARG_SIMILARITY_THRESHOLD, similarity_threshold)?;

        Ok(Self {
            url,
            timeout_seconds,
            similarity_threshold,
            embedding_dim: matches
                .get_one::<usize>(ARG_EMBEDDING_DIM)
                .copied()
                .unwrap_or(512),
        })
    }

    #[must_use]
    pub fn config(&self) -> FaceServiceConfig {
        FaceServiceConfig {
            url: self.url.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
            similarity_threshold: self.similarity_threshold,
            embedding_dim: self.embedding_dim,
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FACE_SERVICE_URL)
                .long(ARG_FACE_SERVICE_URL)
                .help("Base URL of the face recognition service")
                .long_help(
                    "Base URL of the face recognition service.\n\n\
                     Liveness and embedding requests are sent to \
                     `<url>/liveness` and `<url>/embedding`.",
                )
                .env("BIOGATE_FACE_SERVICE_URL"),
        )
        .arg(
            Arg::new(ARG_FACE_SERVICE_TIMEOUT)
                .long(ARG_FACE_SERVICE_TIMEOUT)
                .help("Request timeout for the face service in seconds")
                .env("BIOGATE_FACE_SERVICE_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SIMILARITY_THRESHOLD)
                .long(ARG_SIMILARITY_THRESHOLD)
                .help("Cosine similarity required to authorize a match")
                .env("BIOGATE_SIMILARITY_THRESHOLD")
                .default_value("0.5")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new(ARG_EMBEDDING_DIM)
                .long(ARG_EMBEDDING_DIM)
                .help("Expected embedding length, 0 accepts any")
                .env("BIOGATE_EMBEDDING_DIM")
                .default_value("512")
                .value_parser(clap::value_parser!(usize)),
        )
}
