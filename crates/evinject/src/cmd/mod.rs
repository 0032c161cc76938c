use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host an emulated device and print every forwarded operation.
    Serve(ServeArgs),
    /// Write events into a device's inbound FIFO.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Inbound FIFO path (producer → device). Overrides EventsInPath.
    pub events_in: Option<PathBuf>,
    /// Outbound FIFO path (device → producer). Overrides EventsOutPath.
    pub events_out: Option<PathBuf>,
    /// Emulated device type, e.g. Pointer or Keyboard. Overrides EmulatedType.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub device_type: Option<String>,
    /// Device name used in logs and output. Overrides Identifier.
    #[arg(long)]
    pub name: Option<String>,
    /// JSON file with device options (EventsInPath, EventsOutPath, ...).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// FIFO permission bits in octal, e.g. 600. Overrides FifoMode.
    #[arg(long, value_name = "OCTAL", value_parser = parse_mode)]
    pub mode: Option<u32>,
    /// Exit after printing N operations.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Inbound FIFO path of the device.
    pub path: PathBuf,
    /// Outbound FIFO path, read for the acknowledgment when --sync is set.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// JSON event array (or a single event object).
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub json: Option<String>,
    /// Read the JSON events from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Append a sync marker and wait until the device acknowledges it.
    #[arg(long, requires = "out")]
    pub sync: bool,
    /// Maximum time to wait for the acknowledgment (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_mode(input: &str) -> Result<u32, String> {
    let digits = input.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o777)
        .ok_or_else(|| format!("invalid octal mode: {input}"))
}

/// Parse `5s` / `150ms` / bare seconds.
pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        std::time::Duration::from_millis(value)
    } else {
        std::time::Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_mode_accepts_octal() {
        assert_eq!(parse_mode("600"), Ok(0o600));
        assert_eq!(parse_mode("0o660"), Ok(0o660));
        assert!(parse_mode("888").is_err());
        assert!(parse_mode("7777").is_err());
    }
}
