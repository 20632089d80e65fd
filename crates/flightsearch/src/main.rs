//! `flysearch` - CLI for flightsearch
//!
//! This binary searches the airport database, lists flights, manages favorite
//! routes and runs the interactive search session.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use flightsearch::cli::{self, render, Cli, Command, ConfigCommand, OutputFormat};
use flightsearch::search::{destinations, flights_from};
use flightsearch::{init_logging, Airport, Config, Error, FlightRepository, SqliteRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Search(cmd) => {
            let repository = open_repository(&config)?;
            print!("{}", search_output(&repository, &cmd.query, cmd.format).await?);
        }
        Command::Flights(cmd) => {
            let repository = open_repository(&config)?;
            handle_flights(&repository, &cmd.departure, cmd.format).await?;
        }
        Command::Favorite(cmd) => {
            let repository = open_repository(&config)?;
            handle_favorite(&repository, &cmd.departure, &cmd.destination).await?;
        }
        Command::Favorites(cmd) => {
            let repository = open_repository(&config)?;
            let routes = repository.favorite_routes().await?;
            print!("{}", render::favorite_routes(&routes, cmd.format)?);
        }
        Command::Import(cmd) => {
            let repository = open_repository(&config)?;
            handle_import(&repository, &cmd.file).await?;
        }
        Command::Status(cmd) => {
            let repository = open_repository(&config)?;
            let stats = repository.stats().await?;
            println!("{}", render::status(&repository.path()?, &stats, cmd.json)?);
        }
        Command::Interactive => {
            let repository: Arc<dyn FlightRepository> = Arc::new(open_repository(&config)?);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            cli::interactive::run(repository, config.debounce(), stdin, tokio::io::stdout())
                .await?;
        }
        Command::Config(cmd) => handle_config(&config, cmd)?,
    }
    Ok(())
}

fn open_repository(config: &Config) -> anyhow::Result<SqliteRepository> {
    let path = config.database_path();
    debug!("Opening database at {}", path.display());
    SqliteRepository::open(config)
        .with_context(|| format!("failed to open database at {}", path.display()))
}

async fn find_airport(repository: &SqliteRepository, code: &str) -> anyhow::Result<Airport> {
    let code = code.trim().to_ascii_uppercase();
    repository
        .airport_by_iata_code(&code)
        .await?
        .ok_or_else(|| Error::airport_not_found(code).into())
}

/// Suggestions for `query` exactly as typed, rendered in `format`.
async fn search_output(
    repository: &dyn FlightRepository,
    query: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let airports = repository.suggestions(query).await?;
    Ok(render::airports(&airports, format)?)
}

async fn handle_flights(
    repository: &SqliteRepository,
    departure: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let departure = find_airport(repository, departure).await?;
    let all = repository.all_airports().await?;
    let favorites = repository.all_favorites().await?;
    let flights = flights_from(
        &departure,
        &destinations(&all, Some(&departure)),
        &favorites,
    );
    print!("{}", render::flights(&departure, &flights, format)?);
    Ok(())
}

async fn handle_favorite(
    repository: &SqliteRepository,
    departure: &str,
    destination: &str,
) -> anyhow::Result<()> {
    let departure = find_airport(repository, departure).await?;
    let destination = find_airport(repository, destination).await?;
    if departure.iata_code == destination.iata_code {
        anyhow::bail!("departure and destination must differ");
    }

    let route = departure.route_to(&destination);
    let outcome = repository.toggle_favorite(&route).await?;
    info!("Favorite {} {}", route, outcome);
    println!("Favorite {outcome}: {departure} -> {destination}");
    Ok(())
}

async fn handle_import(repository: &SqliteRepository, file: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let airports: Vec<Airport> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse airports from {}", file.display()))?;

    let count = airports.len();
    let written = repository.import_airports(airports).await?;
    info!("Imported {} of {} airports", written, count);
    println!("Imported {written} airports from {}", file.display());
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                match &config.storage.seed_path {
                    Some(seed) => println!("  Seed path:          {}", seed.display()),
                    None => println!("  Seed path:          (none)"),
                }
                println!();
                println!("[Search]");
                println!("  Debounce (ms):      {}", config.search.debounce_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
