//! `flightsearch` - Airport search with saved favorite routes
//!
//! This library provides the storage, query and presentation-state layers for
//! searching a local airport database by name or IATA code, listing flights
//! from a selected airport, and toggling favorite routes.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod airport;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod repository;
pub mod search;
pub mod session;
pub mod storage;

pub use airport::{Airport, Favorite, FavoriteRoute, FavoriteToggle, Route};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use repository::{FlightRepository, SqliteRepository};
pub use search::Flight;
pub use session::{FlightSession, HomeView};
pub use storage::{Storage, StorageStats};
