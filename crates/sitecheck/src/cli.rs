use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitecheck")]
#[command(version)]
#[command(about = "Helmet and vest compliance checks for site photos")]
pub struct Cli {
    /// Data directory holding the record snapshot (default ~/.sitecheck)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Record filters shared by history and export
#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    /// Inclusive lower bound (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Inclusive upper bound (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Case-insensitive site substring
    #[arg(long)]
    pub site: Option<String>,

    /// Case-insensitive supervisor substring
    #[arg(long)]
    pub supervisor: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the detector on one image and record the result
    Infer {
        image: PathBuf,

        #[arg(long)]
        site: Option<String>,

        #[arg(long)]
        supervisor: Option<String>,

        /// Print the detector answer without storing it
        #[arg(long)]
        no_record: bool,
    },

    /// Run the detector on up to 10 images
    Batch {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Store a detection event from a JSON file (stdin if omitted)
    Record {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List stored events, newest first
    History {
        #[command(flatten)]
        filter: FilterArgs,

        /// Page size (default 50)
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<String>,

        /// Records to skip (default 0)
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,
    },

    /// Delete a stored event by id
    Delete { id: String },

    /// Compliance statistics over a period
    Stats {
        /// 1d, 7d, 30d, 90d or all
        #[arg(long, default_value = "7d")]
        period: String,

        #[arg(long)]
        site: Option<String>,

        #[arg(long)]
        supervisor: Option<String>,
    },

    /// Export stored events as json, csv or xlsx
    Export {
        #[arg(long, default_value = "json")]
        format: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Output path (defaults to the exports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the export to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Score the detector against labelled test images
    Validate {
        /// JSON file with test cases
        file: PathBuf,
    },

    /// Check credentials and detector connectivity
    Health,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_health() {
        let cli = Cli::try_parse_from(["sitecheck", "health"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Health));
    }

    #[test]
    fn test_cli_parse_global_data_dir() {
        let cli = Cli::try_parse_from(["sitecheck", "delete", "det_1", "--data-dir", "/tmp/x"])
            .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        if let Commands::Delete { id } = cli.command {
            assert_eq!(id, "det_1");
        } else {
            panic!("Expected Delete command");
        }
    }

    #[test]
    fn test_cli_parse_history_keeps_raw_paging() {
        let cli = Cli::try_parse_from([
            "sitecheck", "history", "--site", "north", "--limit", "-5", "--offset", "10",
        ])
        .unwrap();
        if let Commands::History {
            filter,
            limit,
            offset,
        } = cli.command
        {
            assert_eq!(filter.site.as_deref(), Some("north"));
            assert_eq!(limit.as_deref(), Some("-5"));
            assert_eq!(offset.as_deref(), Some("10"));
        } else {
            panic!("Expected History command");
        }
    }

    #[test]
    fn test_cli_parse_stats_default_period() {
        let cli = Cli::try_parse_from(["sitecheck", "stats"]).unwrap();
        if let Commands::Stats { period, .. } = cli.command {
            assert_eq!(period, "7d");
        } else {
            panic!("Expected Stats command");
        }
    }

    #[test]
    fn test_cli_batch_requires_images() {
        assert!(Cli::try_parse_from(["sitecheck", "batch"]).is_err());
    }

    #[test]
    fn test_cli_export_output_conflicts_with_stdout() {
        let cli = Cli::try_parse_from(["sitecheck", "export", "--stdout", "-o", "out.csv"]);
        assert!(cli.is_err());
    }
}
