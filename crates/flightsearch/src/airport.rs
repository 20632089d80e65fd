//! Core airport and favorite types for flightsearch.
//!
//! Airports are seeded once and never modified by the application. Favorites
//! are the only rows the user creates or removes.

use serde::{Deserialize, Serialize};

/// An airport row from the seed database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Airport {
    /// Primary key.
    pub id: i64,

    /// Three-letter IATA code, e.g. `LIS`.
    pub iata_code: String,

    /// Display name.
    pub name: String,

    /// Yearly passenger count. Informational only.
    pub passengers: i64,
}

impl Airport {
    /// Create a new airport.
    #[must_use]
    pub fn new(
        id: i64,
        iata_code: impl Into<String>,
        name: impl Into<String>,
        passengers: i64,
    ) -> Self {
        Self {
            id,
            iata_code: iata_code.into(),
            name: name.into(),
            passengers,
        }
    }

    /// Build the route from this airport to `destination`.
    #[must_use]
    pub fn route_to(&self, destination: &Airport) -> Route {
        Route::new(&self.iata_code, &destination.iata_code)
    }
}

impl std::fmt::Display for Airport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.iata_code, self.name)
    }
}

/// An ordered departure/destination pair of IATA codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Departure IATA code.
    pub departure_code: String,

    /// Destination IATA code.
    pub destination_code: String,
}

impl Route {
    /// Create a new route.
    #[must_use]
    pub fn new(departure_code: impl Into<String>, destination_code: impl Into<String>) -> Self {
        Self {
            departure_code: departure_code.into(),
            destination_code: destination_code.into(),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.departure_code, self.destination_code)
    }
}

/// A saved route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Favorite {
    /// Identifier assigned by the storage layer.
    pub id: i64,

    /// Departure IATA code.
    pub departure_code: String,

    /// Destination IATA code.
    pub destination_code: String,
}

impl Favorite {
    /// The route this favorite saves.
    #[must_use]
    pub fn route(&self) -> Route {
        Route::new(&self.departure_code, &self.destination_code)
    }

    /// Check whether this favorite saves exactly `route`.
    #[must_use]
    pub fn matches(&self, route: &Route) -> bool {
        self.departure_code == route.departure_code
            && self.destination_code == route.destination_code
    }
}

/// A favorite with both of its airports looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRoute {
    /// The favorite row.
    pub favorite: Favorite,

    /// Departure airport.
    pub departure: Airport,

    /// Destination airport.
    pub destination: Airport,
}

/// Outcome of toggling a favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "id")]
pub enum FavoriteToggle {
    /// A new favorite was inserted with this id.
    Added(i64),
    /// The existing favorite with this id was deleted.
    Removed(i64),
}

impl FavoriteToggle {
    /// Id of the row that was inserted or deleted.
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Added(id) | Self::Removed(id) => id,
        }
    }

    /// Whether the route is a favorite after the toggle.
    #[must_use]
    pub fn is_favorite(self) -> bool {
        matches!(self, Self::Added(_))
    }
}

impl std::fmt::Display for FavoriteToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added(_) => write!(f, "added"),
            Self::Removed(_) => write!(f, "removed"),
        }
    }
}
