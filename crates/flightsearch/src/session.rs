//! Presentation state for the search screen.
//!
//! A [`FlightSession`] owns the user's inputs (search text, selected airport)
//! and publishes derived results on `watch` channels:
//!
//! - **suggestions**: debounced, de-duplicated search results for the text
//! - **destinations**: every airport except the selected one
//! - **favorites**: all saved routes
//!
//! Each derived channel is fed by a background task that re-queries when its
//! inputs change or when the repository reports a write. Dropping the session
//! aborts those tasks along with any toggles still in flight.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::airport::{Airport, Favorite, FavoriteRoute};
use crate::error::Result;
use crate::repository::FlightRepository;
use crate::search::{destinations, flights_from, Flight};

/// What the home screen should show for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeView {
    /// Search text is empty: saved routes.
    Favorites(Vec<FavoriteRoute>),

    /// The user is typing: matching airports.
    Suggestions(Vec<Airport>),

    /// An airport is selected: flights leaving it.
    Flights {
        /// The selected airport.
        departure: Airport,
        /// One row per destination.
        flights: Vec<Flight>,
    },
}

/// State holder for one search screen.
pub struct FlightSession {
    repository: Arc<dyn FlightRepository>,
    search_text: watch::Sender<String>,
    selected: watch::Sender<Option<Airport>>,
    suggestions: watch::Receiver<Vec<Airport>>,
    destinations: watch::Receiver<Vec<Airport>>,
    favorites: watch::Receiver<Vec<Favorite>>,
    tasks: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for FlightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightSession")
            .field("search_text", &*self.search_text.borrow())
            .field("selected", &*self.selected.borrow())
            .finish_non_exhaustive()
    }
}

impl FlightSession {
    /// Start a session. Must be called from within a tokio runtime.
    ///
    /// `debounce` is the quiet period after the last search-text change
    /// before suggestions are recomputed.
    #[must_use]
    pub fn new(repository: Arc<dyn FlightRepository>, debounce: Duration) -> Self {
        let (search_text, text_rx) = watch::channel(String::new());
        let (selected, selected_rx) = watch::channel(None);
        let (suggestions_tx, suggestions) = watch::channel(Vec::new());
        let (destinations_tx, destinations) = watch::channel(Vec::new());
        let (favorites_tx, favorites) = watch::channel(Vec::new());

        let mut tasks = JoinSet::new();
        tasks.spawn(observe_suggestions(
            Arc::clone(&repository),
            text_rx,
            debounce,
            suggestions_tx,
        ));
        tasks.spawn(observe_destinations(
            Arc::clone(&repository),
            selected_rx,
            destinations_tx,
        ));
        tasks.spawn(observe_favorites(Arc::clone(&repository), favorites_tx));

        Self {
            repository,
            search_text,
            selected,
            suggestions,
            destinations,
            favorites,
            tasks: Mutex::new(tasks),
        }
    }

    /// Current search text.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.search_text.borrow().clone()
    }

    /// Replace the search text.
    ///
    /// Typing something other than the selected airport's code clears the
    /// selection.
    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.selected.send_if_modified(|selected| {
            if selected.as_ref().is_some_and(|a| a.iata_code != text) {
                *selected = None;
                true
            } else {
                false
            }
        });
        trace!("Search text {:?}", text);
        self.search_text.send_replace(text);
    }

    /// Select an airport. The search text becomes its IATA code.
    pub fn select_airport(&self, airport: Airport) {
        debug!("Selected {}", airport);
        let code = airport.iata_code.clone();
        self.selected.send_replace(Some(airport));
        self.search_text.send_replace(code);
    }

    /// Clear the selected airport, keeping the search text.
    pub fn clear_selection(&self) {
        self.selected.send_replace(None);
    }

    /// The selected airport, if any.
    #[must_use]
    pub fn selected_airport(&self) -> Option<Airport> {
        self.selected.borrow().clone()
    }

    /// Subscribe to search suggestions.
    #[must_use]
    pub fn suggestions(&self) -> watch::Receiver<Vec<Airport>> {
        self.suggestions.clone()
    }

    /// Subscribe to destinations from the selected airport.
    #[must_use]
    pub fn destinations(&self) -> watch::Receiver<Vec<Airport>> {
        self.destinations.clone()
    }

    /// Subscribe to saved favorites.
    #[must_use]
    pub fn favorites(&self) -> watch::Receiver<Vec<Favorite>> {
        self.favorites.clone()
    }

    /// Flights from the selected airport with their favorite flags.
    ///
    /// Empty when nothing is selected. The published destinations may still
    /// belong to the previous selection, so they are filtered again against
    /// the current one.
    #[must_use]
    pub fn flights(&self) -> Vec<Flight> {
        match self.selected.borrow().as_ref() {
            Some(departure) => flights_from(
                departure,
                &destinations(&self.destinations.borrow(), Some(departure)),
                &self.favorites.borrow(),
            ),
            None => Vec::new(),
        }
    }

    /// Toggle the favorite for `departure -> destination` in the background.
    ///
    /// Returns immediately; the favorites channel updates once the write lands.
    pub fn toggle_favorite(&self, departure: &Airport, destination: &Airport) {
        let route = departure.route_to(destination);
        let repository = Arc::clone(&self.repository);

        let Ok(mut tasks) = self.tasks.lock() else {
            warn!("Session task set poisoned; dropping toggle for {}", route);
            return;
        };
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match repository.toggle_favorite(&route).await {
                Ok(outcome) => debug!("Favorite {} {}", route, outcome),
                Err(e) => warn!("Failed to toggle favorite {}: {}", route, e),
            }
        });
    }

    /// Resolve what the home screen shows right now.
    ///
    /// # Errors
    ///
    /// Returns an error if favorite routes cannot be loaded.
    pub async fn view(&self) -> Result<HomeView> {
        if let Some(departure) = self.selected_airport() {
            let flights = self.flights();
            return Ok(HomeView::Flights { departure, flights });
        }
        if self.search_text.borrow().is_empty() {
            return Ok(HomeView::Favorites(self.repository.favorite_routes().await?));
        }
        Ok(HomeView::Suggestions(self.suggestions.borrow().clone()))
    }
}

/// Wait until `rx` has been quiet for `quiet`.
///
/// Returns `false` if the sender went away.
async fn settle<T>(rx: &mut watch::Receiver<T>, quiet: Duration) -> bool {
    loop {
        rx.borrow_and_update();
        match tokio::time::timeout(quiet, rx.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return false,
            Err(_) => return true,
        }
    }
}

async fn observe_suggestions(
    repository: Arc<dyn FlightRepository>,
    mut text: watch::Receiver<String>,
    debounce: Duration,
    out: watch::Sender<Vec<Airport>>,
) {
    let mut changes = repository.subscribe();
    let mut current: Option<String> = None;

    // The initial empty query goes through the debounce like any other.
    text.mark_changed();

    loop {
        tokio::select! {
            res = text.changed() => {
                if res.is_err() || !settle(&mut text, debounce).await {
                    break;
                }
                let query = text.borrow_and_update().clone();
                if current.as_ref() == Some(&query) {
                    continue;
                }
                current = Some(query);
            }
            res = changes.changed() => {
                if res.is_err() {
                    break;
                }
                changes.borrow_and_update();
            }
        }

        let Some(query) = current.as_deref() else {
            continue;
        };
        match repository.suggestions(query).await {
            Ok(airports) => {
                trace!("{} suggestions for {:?}", airports.len(), query);
                out.send_replace(airports);
            }
            Err(e) => warn!("Failed to load suggestions for {:?}: {}", query, e),
        }
    }
}

async fn observe_destinations(
    repository: Arc<dyn FlightRepository>,
    mut selected: watch::Receiver<Option<Airport>>,
    out: watch::Sender<Vec<Airport>>,
) {
    let mut changes = repository.subscribe();

    loop {
        changes.borrow_and_update();
        let selection = selected.borrow_and_update().clone();
        match repository.all_airports().await {
            Ok(all) => {
                out.send_replace(destinations(&all, selection.as_ref()));
            }
            Err(e) => warn!("Failed to load destinations: {}", e),
        }

        tokio::select! {
            res = selected.changed() => if res.is_err() { break },
            res = changes.changed() => if res.is_err() { break },
        }
    }
}

async fn observe_favorites(
    repository: Arc<dyn FlightRepository>,
    out: watch::Sender<Vec<Favorite>>,
) {
    let mut changes = repository.subscribe();

    loop {
        changes.borrow_and_update();
        match repository.all_favorites().await {
            Ok(favorites) => {
                out.send_replace(favorites);
            }
            Err(e) => warn!("Failed to load favorites: {}", e),
        }

        if changes.changed().await.is_err() {
            break;
        }
    }
}
