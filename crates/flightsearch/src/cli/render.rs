//! Text rendering for command output.
//!
//! Every function here returns the full text to print so handlers stay thin
//! and output can be checked without a terminal.

use std::fmt::Write as _;

use serde_json::json;

use super::OutputFormat;
use crate::airport::{Airport, FavoriteRoute};
use crate::error::Result;
use crate::search::Flight;
use crate::session::HomeView;
use crate::storage::StorageStats;

const STAR: &str = "*";

/// Render a list of airports.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn airports(airports: &[Airport], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => out = serde_json::to_string_pretty(airports)?,
        OutputFormat::Plain => {
            for airport in airports {
                let _ = writeln!(out, "{airport}");
            }
        }
        OutputFormat::Table => {
            let _ = writeln!(out, "{:<5} {:<40} {:>12}", "CODE", "NAME", "PASSENGERS");
            for airport in airports {
                let _ = writeln!(
                    out,
                    "{:<5} {:<40} {:>12}",
                    airport.iata_code, airport.name, airport.passengers
                );
            }
        }
    }
    if airports.is_empty() && format != OutputFormat::Json {
        out.push_str("No airports found.\n");
    }
    Ok(out)
}

/// Render the flights leaving `departure`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn flights(departure: &Airport, flights: &[Flight], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            let value = json!({
                "departure": departure,
                "flights": flights,
            });
            out = serde_json::to_string_pretty(&value)?;
        }
        OutputFormat::Plain => {
            let _ = writeln!(out, "Flights from {departure}");
            for flight in flights {
                let _ = writeln!(out, "{}", flight_line(flight));
            }
        }
        OutputFormat::Table => {
            let _ = writeln!(out, "Flights from {departure}");
            let _ = writeln!(out, "{:<3} {:<5} {:<40}", "FAV", "CODE", "NAME");
            for flight in flights {
                let _ = writeln!(
                    out,
                    "{:<3} {:<5} {:<40}",
                    star(flight.favorite),
                    flight.destination.iata_code,
                    flight.destination.name
                );
            }
        }
    }
    Ok(out)
}

/// Render saved routes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn favorite_routes(routes: &[FavoriteRoute], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => out = serde_json::to_string_pretty(routes)?,
        OutputFormat::Plain => {
            for route in routes {
                let _ = writeln!(out, "{}", route_line(route));
            }
        }
        OutputFormat::Table => {
            let _ = writeln!(
                out,
                "{:<5} {:<30} {:<5} {:<30}",
                "FROM", "DEPARTURE", "TO", "DESTINATION"
            );
            for route in routes {
                let _ = writeln!(
                    out,
                    "{:<5} {:<30} {:<5} {:<30}",
                    route.departure.iata_code,
                    route.departure.name,
                    route.destination.iata_code,
                    route.destination.name
                );
            }
        }
    }
    if routes.is_empty() && format != OutputFormat::Json {
        out.push_str("No favorite routes yet.\n");
    }
    Ok(out)
}

/// Render database statistics.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn status(database: &std::path::Path, stats: &StorageStats, json: bool) -> Result<String> {
    if json {
        let value = json!({
            "database_path": database,
            "airports": stats.airports,
            "favorites": stats.favorites,
            "schema_version": stats.schema_version,
            "db_size_bytes": stats.db_size_bytes,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "flysearch status");
    let _ = writeln!(out, "----------------");
    let _ = writeln!(out, "Database:      {}", database.display());
    let _ = writeln!(out, "Airports:      {}", stats.airports);
    let _ = writeln!(out, "Favorites:     {}", stats.favorites);
    let _ = writeln!(out, "Schema:        v{}", stats.schema_version);
    let _ = writeln!(out, "Size:          {} bytes", stats.db_size_bytes);
    Ok(out)
}

/// Render the interactive home screen.
#[must_use]
pub fn home_view(view: &HomeView) -> String {
    let mut out = String::new();
    match view {
        HomeView::Favorites(routes) => {
            let _ = writeln!(out, "Favorite routes");
            if routes.is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for route in routes {
                let _ = writeln!(out, "  {}", route_line(route));
            }
        }
        HomeView::Suggestions(airports) => {
            let _ = writeln!(out, "Suggestions");
            if airports.is_empty() {
                let _ = writeln!(out, "  (no match)");
            }
            for airport in airports {
                let _ = writeln!(out, "  {airport}");
            }
        }
        HomeView::Flights { departure, flights } => {
            let _ = writeln!(out, "Flights from {departure}");
            for flight in flights {
                let _ = writeln!(out, "  {}", flight_line(flight));
            }
        }
    }
    out
}

fn star(favorite: bool) -> &'static str {
    if favorite {
        STAR
    } else {
        " "
    }
}

fn flight_line(flight: &Flight) -> String {
    format!("[{}] {}", star(flight.favorite), flight.destination)
}

fn route_line(route: &FavoriteRoute) -> String {
    format!("{} -> {}", route.departure, route.destination)
}
