//! Line-driven interactive search.
//!
//! Plain lines replace the search text. Lines starting with `:` are
//! commands:
//!
//! - `:select CODE` selects an airport and shows its flights
//! - `:fav CODE` toggles the route from the selected airport to `CODE`
//! - `:clear` clears the search text and selection
//! - `:help` lists commands
//! - `:quit` exits

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::debug;

use super::render;
use crate::error::Result;
use crate::repository::FlightRepository;
use crate::session::FlightSession;

/// How long past the debounce to wait for an update before redrawing anyway.
const UPDATE_TIMEOUT: Duration = Duration::from_millis(500);

const HELP: &str = "\
Type to search airports by name or IATA code.
  :select CODE   show flights from CODE
  :fav CODE      toggle the route from the selected airport to CODE
  :clear         clear search and selection
  :help          show this help
  :quit          exit
";

/// A parsed line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Replace the search text.
    Search(String),
    /// Select the airport with this IATA code.
    Select(String),
    /// Toggle the route from the selected airport to this IATA code.
    Favorite(String),
    /// Clear search text and selection.
    Clear,
    /// Show help.
    Help,
    /// Leave the session.
    Quit,
    /// Unrecognized command.
    Unknown(String),
}

/// Parse one line of input.
///
/// IATA code arguments are upper-cased. Search text is kept as typed apart
/// from the trailing newline.
#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    let Some(command) = line.strip_prefix(':') else {
        return Input::Search(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let code = parts.next().map(str::to_ascii_uppercase);
    match (name, code) {
        ("select" | "s", Some(code)) => Input::Select(code),
        ("fav" | "f", Some(code)) => Input::Favorite(code),
        ("clear" | "c", None) => Input::Clear,
        ("help" | "h", None) => Input::Help,
        ("quit" | "q", None) => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

/// Run the interactive loop until `:quit` or end of input.
///
/// # Errors
///
/// Returns an error if reading input, writing output or a repository
/// lookup fails.
pub async fn run<R, W>(
    repository: Arc<dyn FlightRepository>,
    debounce: Duration,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session = FlightSession::new(Arc::clone(&repository), debounce);
    let mut suggestions = session.suggestions();
    let mut destinations = session.destinations();
    let mut favorites = session.favorites();
    let limit = debounce + UPDATE_TIMEOUT;
    let mut lines = input.lines();

    output.write_all(HELP.as_bytes()).await?;
    redraw(&session, &mut output).await?;

    while let Some(line) = lines.next_line().await? {
        debug!("Input {:?}", line);
        match parse_input(&line) {
            Input::Search(text) => {
                suggestions.borrow_and_update();
                session.set_search_text(text);
                wait_for_update(&mut suggestions, limit).await;
            }
            Input::Select(code) => match repository.airport_by_iata_code(&code).await? {
                Some(airport) => {
                    destinations.borrow_and_update();
                    session.select_airport(airport);
                    wait_for_update(&mut destinations, limit).await;
                }
                None => {
                    write_line(&mut output, &format!("Unknown airport {code}")).await?;
                    continue;
                }
            },
            Input::Favorite(code) => {
                let Some(departure) = session.selected_airport() else {
                    write_line(&mut output, "Select a departure airport first").await?;
                    continue;
                };
                if code == departure.iata_code {
                    write_line(&mut output, "Destination must differ from departure").await?;
                    continue;
                }
                match repository.airport_by_iata_code(&code).await? {
                    Some(destination) => {
                        favorites.borrow_and_update();
                        session.toggle_favorite(&departure, &destination);
                        wait_for_update(&mut favorites, limit).await;
                    }
                    None => {
                        write_line(&mut output, &format!("Unknown airport {code}")).await?;
                        continue;
                    }
                }
            }
            Input::Clear => {
                session.clear_selection();
                session.set_search_text("");
            }
            Input::Help => {
                output.write_all(HELP.as_bytes()).await?;
                continue;
            }
            Input::Quit => break,
            Input::Unknown(line) => {
                write_line(&mut output, &format!("Unknown command {line}; try :help")).await?;
                continue;
            }
        }
        redraw(&session, &mut output).await?;
    }

    output.flush().await?;
    Ok(())
}

/// Wait until `rx` publishes a new value or `limit` passes.
///
/// A query equal to the previous one publishes nothing, so the timeout is
/// the normal exit in that case.
async fn wait_for_update<T>(rx: &mut watch::Receiver<T>, limit: Duration) {
    if tokio::time::timeout(limit, rx.changed()).await.is_err() {
        debug!("No update within {:?}; drawing current state", limit);
    }
}

async fn redraw<W>(session: &FlightSession, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let view = session.view().await?;
    output.write_all(render::home_view(&view).as_bytes()).await?;
    output.write_all(b"> ").await?;
    output.flush().await?;
    Ok(())
}

async fn write_line<W>(output: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n> ").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::{Airport, Route};
    use crate::repository::tests::{lisbon_porto, repository_with};

    const DEBOUNCE: Duration = Duration::from_millis(10);

    #[test]
    fn test_parse_search_text() {
        assert_eq!(parse_input("lis\n"), Input::Search("lis".to_string()));
        assert_eq!(parse_input(""), Input::Search(String::new()));
        assert_eq!(parse_input("Sao Paulo"), Input::Search("Sao Paulo".to_string()));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input(":select lis"), Input::Select("LIS".to_string()));
        assert_eq!(parse_input(":s opo"), Input::Select("OPO".to_string()));
        assert_eq!(parse_input(":fav OPO"), Input::Favorite("OPO".to_string()));
        assert_eq!(parse_input(":clear"), Input::Clear);
        assert_eq!(parse_input(":help"), Input::Help);
        assert_eq!(parse_input(":q\r\n"), Input::Quit);
    }

    #[test]
    fn test_parse_unknown_commands() {
        assert_eq!(parse_input(":select"), Input::Unknown(":select".to_string()));
        assert_eq!(parse_input(":bogus"), Input::Unknown(":bogus".to_string()));
    }

    #[tokio::test]
    async fn test_run_search_and_select() {
        let repository = Arc::new(repository_with(lisbon_porto()).await);
        let input: &[u8] = b"lis\n:select opo\n:quit\n";
        let mut output = Vec::new();

        run(repository, DEBOUNCE, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Favorite routes\n  (none)"));
        assert!(text.contains("Suggestions\n  LIS Lisbon"));
        assert!(text.contains("Flights from OPO Porto\n  [ ] LIS Lisbon"));
    }

    #[tokio::test]
    async fn test_run_toggles_favorite() {
        let repository = Arc::new(repository_with(lisbon_porto()).await);
        let input: &[u8] = b":select LIS\n:fav OPO\n";
        let mut output = Vec::new();

        let shared: Arc<dyn FlightRepository> = repository.clone();
        run(shared, DEBOUNCE, input, &mut output).await.unwrap();

        assert!(repository.is_favorite(&Route::new("LIS", "OPO")).await.unwrap());
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("[*] OPO Porto"));
    }

    #[tokio::test]
    async fn test_run_reports_unknown_airport_and_missing_selection() {
        let airports = vec![Airport::new(1, "LIS", "Lisbon", 1)];
        let repository = Arc::new(repository_with(airports).await);
        let input: &[u8] = b":fav LIS\n:select XXX\n";
        let mut output = Vec::new();

        run(repository, DEBOUNCE, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Select a departure airport first"));
        assert!(text.contains("Unknown airport XXX"));
    }

    /// Delays every toggle before delegating.
    struct SlowToggleRepository {
        inner: crate::repository::SqliteRepository,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl FlightRepository for SlowToggleRepository {
        async fn all_airports(&self) -> Result<Vec<Airport>> {
            self.inner.all_airports().await
        }

        async fn airport_by_iata_code(&self, iata_code: &str) -> Result<Option<Airport>> {
            self.inner.airport_by_iata_code(iata_code).await
        }

        async fn search_airports_by_name(&self, query: &str) -> Result<Vec<Airport>> {
            self.inner.search_airports_by_name(query).await
        }

        async fn search_airports_by_iata_code(&self, query: &str) -> Result<Vec<Airport>> {
            self.inner.search_airports_by_iata_code(query).await
        }

        async fn all_favorites(&self) -> Result<Vec<crate::airport::Favorite>> {
            self.inner.all_favorites().await
        }

        async fn favorite_id(&self, route: &Route) -> Result<Option<i64>> {
            self.inner.favorite_id(route).await
        }

        async fn is_favorite(&self, route: &Route) -> Result<bool> {
            self.inner.is_favorite(route).await
        }

        async fn insert_favorite(&self, route: &Route) -> Result<i64> {
            self.inner.insert_favorite(route).await
        }

        async fn delete_favorite_by_id(&self, id: i64) -> Result<bool> {
            self.inner.delete_favorite_by_id(id).await
        }

        async fn toggle_favorite(&self, route: &Route) -> Result<crate::airport::FavoriteToggle> {
            tokio::time::sleep(self.delay).await;
            self.inner.toggle_favorite(route).await
        }

        fn subscribe(&self) -> watch::Receiver<u64> {
            self.inner.subscribe()
        }
    }

    #[tokio::test]
    async fn test_run_redraws_after_slow_toggle_lands() {
        let repository = Arc::new(SlowToggleRepository {
            inner: repository_with(lisbon_porto()).await,
            delay: Duration::from_millis(250),
        });
        let input: &[u8] = b":select LIS\n:fav OPO\n";
        let mut output = Vec::new();

        run(repository, DEBOUNCE, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let last_screen = text.rsplit("Flights from").next().unwrap();
        assert!(last_screen.contains("[*] OPO Porto"));
    }
}
