//! `SQLite` schema definitions for flightsearch.
//!
//! Table and column names match the pre-populated seed database, so a seed
//! file can be opened directly.

/// SQL statement to create the airport table.
pub const CREATE_AIRPORT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS airport (
    id INTEGER PRIMARY KEY NOT NULL,
    iata_code TEXT NOT NULL,
    name TEXT NOT NULL,
    passengers INTEGER NOT NULL
)
";

/// SQL statement to create the favorite table.
///
/// There is intentionally no uniqueness constraint on the route columns.
pub const CREATE_FAVORITE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS favorite (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    departure_code TEXT NOT NULL,
    destination_code TEXT NOT NULL
)
";

/// SQL statement to create an index on `iata_code` for point lookups.
pub const CREATE_IATA_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_airport_iata_code ON airport(iata_code)
";

/// SQL statement to create an index on the favorite route columns.
pub const CREATE_ROUTE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_favorite_route ON favorite(departure_code, destination_code)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_AIRPORT_TABLE,
    CREATE_FAVORITE_TABLE,
    CREATE_IATA_INDEX,
    CREATE_ROUTE_INDEX,
    CREATE_METADATA_TABLE,
];
