//! CLI argument parsing for Scantrace

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scantrace")]
#[command(version)]
#[command(
    about = "Record a packet-switch simulation as a Scansion tracefile",
    long_about = None
)]
pub struct Cli {
    /// Trace file to write (".scnx" is appended when missing)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Load tracer settings from a TOML file; other flags override it
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Packets each sender pushes through the switch
    #[arg(short = 'n', long = "packets", value_name = "N", default_value = "4")]
    pub packets: usize,

    /// Bus transactions issued by the host CPU
    #[arg(long = "transactions", value_name = "N", default_value = "3")]
    pub transactions: usize,

    /// Seed for packet contents and routing
    #[arg(long = "seed", value_name = "SEED", default_value = "24301")]
    pub seed: u64,

    /// Declare entities but record no events
    #[arg(long = "no-events")]
    pub no_events: bool,

    /// Print session statistics as JSON when done
    #[arg(long = "stats")]
    pub stats: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["scantrace"]);
        assert!(cli.output.is_none());
        assert!(cli.config.is_none());
        assert_eq!(cli.packets, 4);
        assert_eq!(cli.transactions, 3);
        assert_eq!(cli.seed, 0x5eed);
        assert!(!cli.no_events);
        assert!(!cli.stats);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_output_flag() {
        let cli = Cli::parse_from(["scantrace", "-o", "run"]);
        assert_eq!(cli.output.as_deref(), Some("run"));

        let cli = Cli::parse_from(["scantrace", "--output", "run.scnx"]);
        assert_eq!(cli.output.as_deref(), Some("run.scnx"));
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["scantrace", "--config", "tracer.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("tracer.toml")));
    }

    #[test]
    fn test_cli_counts() {
        let cli = Cli::parse_from(["scantrace", "-n", "10", "--transactions", "0"]);
        assert_eq!(cli.packets, 10);
        assert_eq!(cli.transactions, 0);
    }

    #[test]
    fn test_cli_switches() {
        let cli = Cli::parse_from(["scantrace", "--no-events", "--stats", "--debug"]);
        assert!(cli.no_events);
        assert!(cli.stats);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_rejects_negative_count() {
        assert!(Cli::try_parse_from(["scantrace", "--packets", "-1"]).is_err());
    }
}
