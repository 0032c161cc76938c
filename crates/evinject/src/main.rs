mod cmd;
mod events;
mod exit;
mod host;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "evinject",
    version,
    about = "Inject input events into an emulated device through named FIFOs"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "EVINJECT_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "evinject",
            "serve",
            "/tmp/in.fifo",
            "/tmp/out.fifo",
            "--type",
            "Pointer",
            "--count",
            "3",
        ])
        .expect("serve args should parse");

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.device_type.as_deref(), Some("Pointer"));
        assert_eq!(args.count, Some(3));
    }

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "evinject",
            "send",
            "/tmp/in.fifo",
            "--out",
            "/tmp/out.fifo",
            "--sync",
            "--json",
            r#"{"type":"key","code":30,"down":true}"#,
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(ref args) if args.sync));
    }

    #[test]
    fn rejects_conflicting_event_sources() {
        let err = Cli::try_parse_from([
            "evinject",
            "send",
            "/tmp/in.fifo",
            "--json",
            "[]",
            "--file",
            "/tmp/events.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn sync_requires_outbound_path() {
        let err = Cli::try_parse_from(["evinject", "send", "/tmp/in.fifo", "--sync", "--json", "[]"])
            .expect_err("--sync without --out should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
