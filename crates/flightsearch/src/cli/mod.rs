//! Command-line interface for flightsearch.
//!
//! This module provides the CLI structure, output rendering and the
//! interactive view for the `flysearch` binary.

mod commands;
pub mod interactive;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FavoriteCommand, FavoritesCommand, FlightsCommand, ImportCommand,
    OutputFormat, SearchCommand, StatusCommand,
};

/// flysearch - Search airports and keep favorite routes
///
/// Looks up airports by name or IATA code in a local database, lists the
/// flights leaving an airport, and saves departure/destination pairs.
#[derive(Debug, Parser)]
#[command(name = "flysearch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search airports by name or IATA code
    Search(SearchCommand),

    /// List flights leaving an airport
    Flights(FlightsCommand),

    /// Add or remove a favorite route
    Favorite(FavoriteCommand),

    /// List favorite routes
    Favorites(FavoritesCommand),

    /// Import airports from a JSON file
    Import(ImportCommand),

    /// Show database status
    Status(StatusCommand),

    /// Start an interactive search session
    Interactive,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "flysearch");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;
        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["flysearch", "search", "Lisbon", "-f", "json"]).unwrap();
        match cli.command {
            Command::Search(cmd) => {
                assert_eq!(cmd.query, "Lisbon");
                assert_eq!(cmd.format, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_flights_default_format() {
        let cli = Cli::try_parse_from(["flysearch", "flights", "LIS"]).unwrap();
        match cli.command {
            Command::Flights(cmd) => {
                assert_eq!(cmd.departure, "LIS");
                assert_eq!(cmd.format, OutputFormat::Table);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_favorite_requires_both_codes() {
        assert!(Cli::try_parse_from(["flysearch", "favorite", "GRU"]).is_err());

        let cli = Cli::try_parse_from(["flysearch", "favorite", "GRU", "LIS"]).unwrap();
        match cli.command {
            Command::Favorite(cmd) => {
                assert_eq!(cmd.departure, "GRU");
                assert_eq!(cmd.destination, "LIS");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_interactive() {
        let cli = Cli::try_parse_from(["flysearch", "interactive"]).unwrap();
        assert!(matches!(cli.command, Command::Interactive));
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from(["flysearch", "import", "airports.json"]).unwrap();
        match cli.command {
            Command::Import(cmd) => assert_eq!(cmd.file, PathBuf::from("airports.json")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["flysearch", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet() {
        let cli = Cli::try_parse_from(["flysearch", "-vv", "favorites"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["flysearch", "-q", "favorites"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["flysearch", "config", "validate", "-f", "x.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
