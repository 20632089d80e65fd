//! Result composition for the search screen.
//!
//! These functions are pure: the repository supplies the rows, and the
//! session decides when to recompute.

use std::collections::HashSet;

use crate::airport::{Airport, Favorite, FavoriteRoute, Route};

/// Merge name matches and code matches into one suggestion list.
///
/// Name matches come first. An airport appearing in both lists keeps its
/// first position; later occurrences with the same id are dropped.
#[must_use]
pub fn merge_suggestions(by_name: Vec<Airport>, by_code: Vec<Airport>) -> Vec<Airport> {
    let mut seen = HashSet::with_capacity(by_name.len() + by_code.len());
    by_name
        .into_iter()
        .chain(by_code)
        .filter(|airport| seen.insert(airport.id))
        .collect()
}

/// Every airport except the selected one.
///
/// With no selection the full list is returned. Airports are compared by
/// IATA code.
#[must_use]
pub fn destinations(all: &[Airport], selected: Option<&Airport>) -> Vec<Airport> {
    all.iter()
        .filter(|airport| selected.map_or(true, |s| airport.iata_code != s.iata_code))
        .cloned()
        .collect()
}

/// A destination row on the flights screen.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Flight {
    /// Departure airport (the selected one).
    pub departure: Airport,
    /// Destination airport.
    pub destination: Airport,
    /// Whether the route is saved as a favorite.
    pub favorite: bool,
}

impl Flight {
    /// The route this flight represents.
    #[must_use]
    pub fn route(&self) -> Route {
        self.departure.route_to(&self.destination)
    }
}

/// Pair each destination with the departure airport and its favorite flag.
#[must_use]
pub fn flights_from(
    departure: &Airport,
    destinations: &[Airport],
    favorites: &[Favorite],
) -> Vec<Flight> {
    let saved: HashSet<Route> = favorites.iter().map(Favorite::route).collect();
    destinations
        .iter()
        .map(|destination| Flight {
            departure: departure.clone(),
            destination: destination.clone(),
            favorite: saved.contains(&departure.route_to(destination)),
        })
        .collect()
}

/// Resolve each favorite's codes to airports with `lookup`.
///
/// Favorites whose departure or destination cannot be found are skipped.
pub fn resolve_favorites<F>(favorites: &[Favorite], mut lookup: F) -> Vec<FavoriteRoute>
where
    F: FnMut(&str) -> Option<Airport>,
{
    favorites
        .iter()
        .filter_map(|favorite| {
            let departure = lookup(&favorite.departure_code)?;
            let destination = lookup(&favorite.destination_code)?;
            Some(FavoriteRoute {
                favorite: favorite.clone(),
                departure,
                destination,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lis() -> Airport {
        Airport::new(1, "LIS", "Lisbon", 100)
    }

    fn opo() -> Airport {
        Airport::new(2, "OPO", "Porto", 50)
    }

    fn gru() -> Airport {
        Airport::new(3, "GRU", "Sao Paulo", 200)
    }

    fn favorite(id: i64, departure: &str, destination: &str) -> Favorite {
        Favorite {
            id,
            departure_code: departure.to_string(),
            destination_code: destination.to_string(),
        }
    }

    #[test]
    fn test_merge_keeps_name_matches_first() {
        let merged = merge_suggestions(vec![opo()], vec![lis(), opo()]);
        assert_eq!(merged, vec![opo(), lis()]);
    }

    #[test]
    fn test_merge_has_no_duplicate_ids() {
        let merged = merge_suggestions(
            vec![lis(), opo(), lis()],
            vec![opo(), gru(), lis(), gru()],
        );
        let ids: Vec<i64> = merged.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_suggestions(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_destinations_exclude_selected() {
        let all = vec![lis(), opo(), gru()];
        let result = destinations(&all, Some(&opo()));
        assert_eq!(result, vec![lis(), gru()]);
        assert!(!result.iter().any(|a| a.iata_code == "OPO"));
    }

    #[test]
    fn test_destinations_without_selection() {
        let all = vec![lis(), opo()];
        assert_eq!(destinations(&all, None), all);
    }

    #[test]
    fn test_destinations_selected_not_in_list() {
        let all = vec![lis(), opo()];
        assert_eq!(destinations(&all, Some(&gru())), all);
    }

    #[test]
    fn test_flights_from_marks_favorites() {
        let favorites = vec![favorite(1, "GRU", "LIS"), favorite(2, "LIS", "GRU")];
        let flights = flights_from(&gru(), &[lis(), opo()], &favorites);

        assert_eq!(flights.len(), 2);
        assert!(flights[0].favorite);
        assert!(!flights[1].favorite);
        assert_eq!(flights[0].route(), Route::new("GRU", "LIS"));
    }

    #[test]
    fn test_resolve_favorites_skips_unknown_airports() {
        let airports = [lis(), opo()];
        let lookup = |code: &str| airports.iter().find(|a| a.iata_code == code).cloned();
        let favorites = vec![favorite(1, "LIS", "OPO"), favorite(2, "LIS", "XXX")];

        let resolved = resolve_favorites(&favorites, lookup);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].departure, lis());
        assert_eq!(resolved[0].destination, opo());
        assert_eq!(resolved[0].favorite.id, 1);
    }
}
