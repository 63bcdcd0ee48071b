//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VirusGuard: on-demand file scanner with signature and heuristic detection
#[derive(Parser, Debug)]
#[command(name = "virusguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine processing
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a file or directory
    Scan {
        /// File or directory to scan
        path: PathBuf,

        /// Full mode: adds entropy analysis and flags at a lower risk score
        #[arg(short, long)]
        full: bool,

        /// Extra exclusion pattern (repeatable)
        #[arg(short, long = "exclude", value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Don't apply the configured exclusion patterns
        #[arg(long)]
        no_default_excludes: bool,

        /// Maximum concurrent file scans (1-8)
        #[arg(short, long, value_name = "N")]
        parallelism: Option<usize>,
    },

    /// Manage quarantined items
    Quarantine {
        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// Inspect saved scan reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show application information
    Info,
}

/// Quarantine subcommands.
#[derive(Subcommand, Debug)]
pub enum QuarantineAction {
    /// List quarantined items
    List,

    /// Scan a file and quarantine it if flagged
    Add {
        /// File to quarantine
        path: PathBuf,

        /// Quarantine even if the scan finds it clean
        #[arg(long)]
        force: bool,
    },

    /// Restore a quarantined item to its original location
    Restore {
        /// SHA-256 digest of the item
        digest: String,
    },
}

/// Report subcommands.
#[derive(Subcommand, Debug)]
pub enum ReportAction {
    /// List saved reports, newest first
    List,

    /// Show a report (defaults to the newest)
    Show {
        /// Report file
        path: Option<PathBuf>,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file location
    Path,

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "virusguard",
            "scan",
            "/data",
            "--full",
            "-e",
            "vendor",
            "--exclude",
            "dist",
            "--parallelism",
            "2",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Some(Commands::Scan {
                path,
                full,
                exclude,
                no_default_excludes,
                parallelism,
            }) => {
                assert_eq!(path, PathBuf::from("/data"));
                assert!(full);
                assert_eq!(exclude, vec!["vendor", "dist"]);
                assert!(!no_default_excludes);
                assert_eq!(parallelism, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_quarantine_restore() {
        let cli =
            Cli::try_parse_from(["virusguard", "-v", "quarantine", "restore", "ABCD"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Some(Commands::Quarantine {
                action: QuarantineAction::Restore { ref digest }
            }) if digest == "ABCD"
        ));
    }

    #[test]
    fn test_scan_requires_path() {
        assert!(Cli::try_parse_from(["virusguard", "scan"]).is_err());
    }
}
