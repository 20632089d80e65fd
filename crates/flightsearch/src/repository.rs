//! Async repository over the storage layer.
//!
//! [`FlightRepository`] is the seam between the presentation state holder and
//! persistence. The `SQLite` implementation runs every call on the blocking
//! pool and publishes a change counter after each write so observers know to
//! re-query.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::airport::{Airport, Favorite, FavoriteRoute, FavoriteToggle, Route};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::search::{merge_suggestions, resolve_favorites};
use crate::storage::{Storage, StorageStats};

/// Queries and writes the presentation layer needs.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Every airport, ordered by id.
    async fn all_airports(&self) -> Result<Vec<Airport>>;

    /// Look up an airport by exact IATA code.
    async fn airport_by_iata_code(&self, iata_code: &str) -> Result<Option<Airport>>;

    /// Airports whose name contains `query`.
    async fn search_airports_by_name(&self, query: &str) -> Result<Vec<Airport>>;

    /// Airports whose IATA code contains `query`.
    async fn search_airports_by_iata_code(&self, query: &str) -> Result<Vec<Airport>>;

    /// Every favorite, ordered by id.
    async fn all_favorites(&self) -> Result<Vec<Favorite>>;

    /// Id of the favorite saving `route`, if any.
    async fn favorite_id(&self, route: &Route) -> Result<Option<i64>>;

    /// Whether `route` is saved.
    async fn is_favorite(&self, route: &Route) -> Result<bool>;

    /// Insert a favorite for `route` without checking for an existing one.
    async fn insert_favorite(&self, route: &Route) -> Result<i64>;

    /// Delete a favorite by id. Returns `false` if nothing was deleted.
    async fn delete_favorite_by_id(&self, id: i64) -> Result<bool>;

    /// Delete the favorite for `route` if present, otherwise insert it.
    async fn toggle_favorite(&self, route: &Route) -> Result<FavoriteToggle>;

    /// Subscribe to the change counter. It ticks after every write.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Name matches followed by code matches, de-duplicated by id.
    async fn suggestions(&self, query: &str) -> Result<Vec<Airport>> {
        let by_name = self.search_airports_by_name(query).await?;
        let by_code = self.search_airports_by_iata_code(query).await?;
        Ok(merge_suggestions(by_name, by_code))
    }

    /// Favorites with both airports looked up; unresolvable ones are skipped.
    async fn favorite_routes(&self) -> Result<Vec<FavoriteRoute>> {
        let favorites = self.all_favorites().await?;
        if favorites.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_code: HashMap<String, Airport> = HashMap::new();
        for airport in self.all_airports().await? {
            by_code.entry(airport.iata_code.clone()).or_insert(airport);
        }
        Ok(resolve_favorites(&favorites, |code| by_code.get(code).cloned()))
    }
}

/// [`FlightRepository`] backed by a single `SQLite` connection.
#[derive(Debug)]
pub struct SqliteRepository {
    storage: Arc<Mutex<Storage>>,
    changes: watch::Sender<u64>,
}

impl SqliteRepository {
    /// Wrap an open storage.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            storage: Arc::new(Mutex::new(storage)),
            changes,
        }
    }

    /// Open the database named by `config`, seeding it if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or seeded.
    pub fn open(config: &Config) -> Result<Self> {
        let storage =
            Storage::open_with_seed(config.database_path(), config.storage.seed_path.as_deref())?;
        Ok(Self::new(storage))
    }

    /// Insert or replace airports.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn import_airports(&self, airports: Vec<Airport>) -> Result<usize> {
        let written = self
            .run(move |storage| storage.insert_airports(&airports))
            .await?;
        if written > 0 {
            self.notify();
        }
        Ok(written)
    }

    /// Database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn stats(&self) -> Result<StorageStats> {
        self.run(|storage| storage.stats()).await
    }

    /// Path of the underlying database.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lock is poisoned.
    pub fn path(&self) -> Result<std::path::PathBuf> {
        let storage = self
            .storage
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))?;
        Ok(storage.path().to_path_buf())
    }

    /// Run `f` against the storage on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Storage) -> Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || {
            let mut storage = storage
                .lock()
                .map_err(|_| Error::internal("storage lock poisoned"))?;
            f(&mut storage)
        })
        .await?
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
        debug!("Tables changed (version {})", *self.changes.borrow());
    }
}

#[async_trait]
impl FlightRepository for SqliteRepository {
    async fn all_airports(&self) -> Result<Vec<Airport>> {
        self.run(|storage| storage.all_airports()).await
    }

    async fn airport_by_iata_code(&self, iata_code: &str) -> Result<Option<Airport>> {
        let iata_code = iata_code.to_string();
        self.run(move |storage| storage.airport_by_iata_code(&iata_code))
            .await
    }

    async fn search_airports_by_name(&self, query: &str) -> Result<Vec<Airport>> {
        let query = query.to_string();
        self.run(move |storage| storage.search_airports_by_name(&query))
            .await
    }

    async fn search_airports_by_iata_code(&self, query: &str) -> Result<Vec<Airport>> {
        let query = query.to_string();
        self.run(move |storage| storage.search_airports_by_iata_code(&query))
            .await
    }

    async fn all_favorites(&self) -> Result<Vec<Favorite>> {
        self.run(|storage| storage.all_favorites()).await
    }

    async fn favorite_id(&self, route: &Route) -> Result<Option<i64>> {
        let route = route.clone();
        self.run(move |storage| storage.favorite_id(&route)).await
    }

    async fn is_favorite(&self, route: &Route) -> Result<bool> {
        let route = route.clone();
        self.run(move |storage| storage.is_favorite(&route)).await
    }

    async fn insert_favorite(&self, route: &Route) -> Result<i64> {
        let route = route.clone();
        let id = self
            .run(move |storage| storage.insert_favorite(&route))
            .await?;
        self.notify();
        Ok(id)
    }

    async fn delete_favorite_by_id(&self, id: i64) -> Result<bool> {
        let deleted = self
            .run(move |storage| storage.delete_favorite_by_id(id))
            .await?;
        if deleted {
            self.notify();
        }
        Ok(deleted)
    }

    async fn toggle_favorite(&self, route: &Route) -> Result<FavoriteToggle> {
        let route = route.clone();
        let outcome = self
            .run(move |storage| storage.toggle_favorite(&route))
            .await?;
        self.notify();
        Ok(outcome)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn lisbon_porto() -> Vec<Airport> {
        vec![
            Airport::new(1, "LIS", "Lisbon", 31_000_000),
            Airport::new(2, "OPO", "Porto", 15_000_000),
        ]
    }

    pub(crate) async fn repository_with(airports: Vec<Airport>) -> SqliteRepository {
        let repository = SqliteRepository::new(Storage::open_in_memory().unwrap());
        repository.import_airports(airports).await.unwrap();
        repository
    }

    #[tokio::test]
    async fn test_suggestions_example() {
        let repository = repository_with(lisbon_porto()).await;
        let suggestions = repository.suggestions("LIS").await.unwrap();
        assert_eq!(suggestions, vec![Airport::new(1, "LIS", "Lisbon", 31_000_000)]);
    }

    #[tokio::test]
    async fn test_suggestions_no_duplicates() {
        let repository = repository_with(vec![
            Airport::new(1, "POA", "Porto Alegre", 1),
            Airport::new(2, "OPO", "Porto", 2),
            Airport::new(3, "LIS", "Lisbon", 3),
        ])
        .await;

        // "PO" matches the names and the codes of both Porto airports.
        let suggestions = repository.suggestions("PO").await.unwrap();
        let ids: Vec<i64> = suggestions.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_favorite_lookups() {
        let repository = repository_with(lisbon_porto()).await;
        let route = Route::new("LIS", "OPO");

        assert!(!repository.is_favorite(&route).await.unwrap());
        assert!(repository.favorite_id(&route).await.unwrap().is_none());

        let id = repository.insert_favorite(&route).await.unwrap();
        assert!(repository.is_favorite(&route).await.unwrap());
        assert_eq!(repository.favorite_id(&route).await.unwrap(), Some(id));

        assert!(repository.delete_favorite_by_id(id).await.unwrap());
        assert!(!repository.is_favorite(&route).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_twice_leaves_no_favorites() {
        let repository = repository_with(lisbon_porto()).await;
        let route = Route::new("GRU", "LIS");

        let added = repository.toggle_favorite(&route).await.unwrap();
        assert!(added.is_favorite());
        let removed = repository.toggle_favorite(&route).await.unwrap();
        assert_eq!(removed, FavoriteToggle::Removed(added.id()));

        assert!(repository.all_favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_toggles_stay_consistent() {
        let repository = Arc::new(repository_with(lisbon_porto()).await);
        let route = Route::new("LIS", "OPO");

        let mut handles = Vec::new();
        for _ in 0..6 {
            let repository = Arc::clone(&repository);
            let route = route.clone();
            handles.push(tokio::spawn(async move {
                repository.toggle_favorite(&route).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // An even number of toggles always ends with no favorite and no duplicates.
        assert!(repository.all_favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_tick_change_counter() {
        let repository = repository_with(lisbon_porto()).await;
        let mut changes = repository.subscribe();
        let before = *changes.borrow_and_update();

        repository
            .toggle_favorite(&Route::new("LIS", "OPO"))
            .await
            .unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), before + 1);
    }

    #[tokio::test]
    async fn test_reads_do_not_tick() {
        let repository = repository_with(lisbon_porto()).await;
        let mut changes = repository.subscribe();
        changes.borrow_and_update();

        repository.all_airports().await.unwrap();
        repository.delete_favorite_by_id(42).await.unwrap();

        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_favorite_routes_skip_unknown_airports() {
        let repository = repository_with(lisbon_porto()).await;
        repository
            .insert_favorite(&Route::new("LIS", "OPO"))
            .await
            .unwrap();
        repository
            .insert_favorite(&Route::new("LIS", "XXX"))
            .await
            .unwrap();

        let routes = repository.favorite_routes().await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].departure.iata_code, "LIS");
        assert_eq!(routes[0].destination.iata_code, "OPO");
    }

    #[tokio::test]
    async fn test_stats_and_path() {
        let repository = repository_with(lisbon_porto()).await;
        let stats = repository.stats().await.unwrap();
        assert_eq!(stats.airports, 2);
        assert_eq!(stats.favorites, 0);
        assert_eq!(repository.path().unwrap().to_string_lossy(), ":memory:");
    }
}
