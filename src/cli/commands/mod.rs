pub mod face;
pub mod gate;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

/// Reject similarity thresholds outside the cosine range.
///
/// # Errors
/// Returns an error naming the offending flag.
pub fn ensure_unit_range(name: &str, value: f32) -> anyhow::Result<()> {
    if !(-1.0..=1.0).contains(&value) {
        anyhow::bail!("--{name} must be between -1 and 1, got {value}");
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("biogate")
        .about("Biometric access-control gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8000")
                .env("BIOGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = face::with_args(command);
    let command = gate::with_args(command);
    logging::with_args(command)
}
