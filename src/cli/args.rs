use crate::models::ClusterLevel;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "presence-processor")]
#[command(about = "Election presence processor: county attendance, demographics and clustering")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Settings file [default: presence-processor.toml]"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Data directory, overrides the settings file")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate a per-station presence file into the county attendance table
    Aggregate {
        #[arg(short, long, help = "Presence CSV [default: <data-dir>/presence_now.csv]")]
        input: Option<PathBuf>,

        #[arg(long, help = "Sum urban/rural splits from station types instead of estimating")]
        direct_urban_rural: bool,
    },

    /// Refresh the attendance and results tables
    Update {
        #[arg(long, help = "Regenerate both tables from scratch")]
        fresh: bool,

        #[arg(
            long,
            help = "Process this presence file, then update the results table only \
                    (the freshly aggregated attendance is not perturbed)"
        )]
        presence: Option<PathBuf>,

        #[arg(
            long,
            default_value = "0",
            help = "Repeat every N seconds until Ctrl-C (0 = run once)"
        )]
        interval: u64,
    },

    /// National and per-county demographic breakdown as JSON
    Demographics {
        #[arg(short, long, help = "Write the report here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Cluster voting units by demographic composition
    Cluster {
        #[arg(short, long, help = "Presence CSV [default: <data-dir>/Cluster/presence_now.csv]")]
        input: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "county")]
        level: ClusterLevel,

        #[arg(
            short = 'k',
            long,
            value_parser = RangedU64ValueParser::<usize>::new().range(1..),
            help = "Number of clusters [default: from settings]"
        )]
        n_clusters: Option<usize>,

        #[arg(long, help = "Worker threads for k-means restarts [default: from settings]")]
        max_workers: Option<usize>,

        #[arg(short, long, help = "Write the result here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Print the attendance table, or one county
    Show {
        #[arg(long, help = "County name, matched case-insensitively")]
        county: Option<String>,
    },

    /// Last update time of each table
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_show_county_argument() {
        let cli = Cli::try_parse_from(["presence-processor", "-c", "settings.toml", "show", "--county", "Cluj"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("settings.toml")));
        match cli.command {
            Commands::Show { county } => assert_eq!(county.as_deref(), Some("Cluj")),
            _ => panic!("expected show command"),
        }
    }

    #[test]
    fn test_presence_help_says_only_results_are_perturbed() {
        let command = Cli::command();
        let update = command.find_subcommand("update").unwrap();
        let presence = update
            .get_arguments()
            .find(|arg| arg.get_id() == "presence")
            .unwrap();
        let help = presence.get_help().unwrap().to_string();
        assert!(help.contains("results table only"));
        assert!(help.contains("not perturbed"));
    }

    #[test]
    fn test_cluster_arguments() {
        let cli = Cli::try_parse_from([
            "presence-processor",
            "--data-dir",
            "/tmp/data",
            "cluster",
            "--level",
            "polling",
            "-k",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/data")));
        match cli.command {
            Commands::Cluster {
                level, n_clusters, ..
            } => {
                assert_eq!(level, ClusterLevel::Polling);
                assert_eq!(n_clusters, Some(3));
            }
            _ => panic!("expected cluster command"),
        }
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let parsed = Cli::try_parse_from(["presence-processor", "cluster", "-k", "0"]);
        assert!(parsed.is_err());
    }
}
