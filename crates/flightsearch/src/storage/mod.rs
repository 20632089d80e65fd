//! Storage layer for flightsearch.
//!
//! This module provides `SQLite`-based persistent storage for airports and
//! favorite routes. Airports come from a pre-populated seed database; the
//! only rows written during normal use are favorites.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::airport::{Airport, Favorite, FavoriteToggle, Route};
use crate::error::{Error, Result};

const AIRPORT_COLUMNS: &str = "id, iata_code, name, passengers";

/// Storage engine for airports and favorites.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Substring search over airport names and IATA codes
/// - Favorite lookups, inserts and deletes
/// - An atomic favorite toggle
/// - Seeding from a pre-populated database file
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_seed(path, None)
    }

    /// Open a storage database, copying `seed` into place first when the
    /// database file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed cannot be copied, the database cannot be
    /// opened, or schema initialization fails.
    pub fn open_with_seed(path: impl AsRef<Path>, seed: Option<&Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        if let Some(seed) = seed {
            if !path.exists() {
                info!(
                    "Seeding database {} from {}",
                    path.display(),
                    seed.display()
                );
                std::fs::copy(seed, &path).map_err(|source| Error::SeedCopy {
                    from: seed.to_path_buf(),
                    to: path.clone(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Airports ===

    /// Insert or replace airports in one transaction.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_airports(&mut self, airports: &[Airport]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO airport (id, iata_code, name, passengers) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for airport in airports {
                written += stmt.execute(params![
                    airport.id,
                    airport.iata_code,
                    airport.name,
                    airport.passengers,
                ])?;
            }
        }
        tx.commit()?;

        info!("Imported {} airports", written);
        Ok(written)
    }

    /// Get every airport, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_airports(&self) -> Result<Vec<Airport>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {AIRPORT_COLUMNS} FROM airport ORDER BY id"))?;
        let airports = stmt
            .query_map([], Self::row_to_airport)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(airports)
    }

    /// Look up an airport by its exact IATA code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn airport_by_iata_code(&self, iata_code: &str) -> Result<Option<Airport>> {
        let airport = self
            .conn
            .query_row(
                &format!(
                    "SELECT {AIRPORT_COLUMNS} FROM airport WHERE iata_code = ?1 ORDER BY id LIMIT 1"
                ),
                [iata_code],
                Self::row_to_airport,
            )
            .optional()?;
        Ok(airport)
    }

    /// Airports whose name contains `query`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_airports_by_name(&self, query: &str) -> Result<Vec<Airport>> {
        self.search_column("name", query)
    }

    /// Airports whose IATA code contains `query`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_airports_by_iata_code(&self, query: &str) -> Result<Vec<Airport>> {
        self.search_column("iata_code", query)
    }

    /// `column` is always one of our own literals, never user input.
    fn search_column(&self, column: &str, query: &str) -> Result<Vec<Airport>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(&format!(
            r"SELECT {AIRPORT_COLUMNS} FROM airport WHERE {column} LIKE ?1 ESCAPE '\' ORDER BY id"
        ))?;
        let airports = stmt
            .query_map([pattern], Self::row_to_airport)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Search on {} for {:?}: {} rows", column, query, airports.len());
        Ok(airports)
    }

    /// Count airports in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_airports(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM airport", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Favorites ===

    /// Get every favorite, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_favorites(&self) -> Result<Vec<Favorite>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, departure_code, destination_code FROM favorite ORDER BY id",
        )?;
        let favorites = stmt
            .query_map([], Self::row_to_favorite)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    /// Id of the favorite saving `route`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn favorite_id(&self, route: &Route) -> Result<Option<i64>> {
        Self::find_favorite_id(&self.conn, route)
    }

    /// Check whether `route` is a favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_favorite(&self, route: &Route) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM favorite WHERE departure_code = ?1 AND destination_code = ?2)",
            params![route.departure_code, route.destination_code],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a favorite for `route` and return its id.
    ///
    /// Does not check for an existing row; see [`Storage::toggle_favorite`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_favorite(&self, route: &Route) -> Result<i64> {
        Self::insert_favorite_on(&self.conn, route)
    }

    /// Delete a favorite by id.
    ///
    /// Returns `true` if a row was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_favorite_by_id(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM favorite WHERE id = ?1", [id])?;
        debug!("Deleted favorite {} ({} rows)", id, affected);
        Ok(affected > 0)
    }

    /// Delete the favorite for `route` if it exists, otherwise insert one.
    ///
    /// The lookup and the write share one `IMMEDIATE` transaction, so two
    /// toggles on the same route cannot interleave.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn toggle_favorite(&mut self, route: &Route) -> Result<FavoriteToggle> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = match Self::find_favorite_id(&tx, route)? {
            Some(id) => {
                tx.execute("DELETE FROM favorite WHERE id = ?1", [id])?;
                FavoriteToggle::Removed(id)
            }
            None => FavoriteToggle::Added(Self::insert_favorite_on(&tx, route)?),
        };

        tx.commit()?;
        debug!("Favorite {} {}", route, outcome);
        Ok(outcome)
    }

    /// Count favorites in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_favorites(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM favorite", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            airports: self.count_airports()?,
            favorites: self.count_favorites()?,
            schema_version: migrations::schema_version(&self.conn)?,
            db_size_bytes,
        })
    }

    fn find_favorite_id(conn: &Connection, route: &Route) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM favorite WHERE departure_code = ?1 AND destination_code = ?2 ORDER BY id LIMIT 1",
                params![route.departure_code, route.destination_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_favorite_on(conn: &Connection, route: &Route) -> Result<i64> {
        conn.execute(
            "INSERT INTO favorite (departure_code, destination_code) VALUES (?1, ?2)",
            params![route.departure_code, route.destination_code],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted favorite {} with id {}", route, id);
        Ok(id)
    }

    fn row_to_airport(row: &rusqlite::Row) -> rusqlite::Result<Airport> {
        Ok(Airport {
            id: row.get(0)?,
            iata_code: row.get(1)?,
            name: row.get(2)?,
            passengers: row.get(3)?,
        })
    }

    fn row_to_favorite(row: &rusqlite::Row) -> rusqlite::Result<Favorite> {
        Ok(Favorite {
            id: row.get(0)?,
            departure_code: row.get(1)?,
            destination_code: row.get(2)?,
        })
    }
}

/// Build a `LIKE` pattern matching `query` as a literal substring.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of airports.
    pub airports: i64,
    /// Number of favorites.
    pub favorites: i64,
    /// Schema version recorded in the metadata table.
    pub schema_version: i32,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
