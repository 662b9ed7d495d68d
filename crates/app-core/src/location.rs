//! Location search and reverse geocoding
//!
//! Drives the location-picker sheet: debounced forward search with
//! last-keystroke-wins response guarding, an unbounded per-session
//! reverse-geocode cache keyed by rounded coordinates, and great-circle
//! distance from the shop.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use shop_client::{Coordinate, GeocodeApi, PlaceHit};

/// Default debounce interval for search-box input
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Sentinel returned when reverse geocoding fails. Never cached.
pub const PLACE_NAME_UNAVAILABLE: &str = "location name unavailable";

/// Decimal degrees kept when rounding coordinates into cache keys.
/// Four decimals is roughly an 11 m cell at the equator.
const KEY_DECIMALS: usize = 4;

/// Earth mean radius in meters (IUGG)
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Phase of the search-box state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    /// No input pending
    #[default]
    Idle,
    /// Waiting for the input to settle
    Debouncing,
    /// A geocode request is in flight
    Querying,
}

/// Search results published to the location-picker sheet
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// The text these hits were resolved for
    pub query: String,
    /// Candidate places
    pub hits: Vec<PlaceHit>,
}

/// A resolved map tap
#[derive(Debug, Clone, PartialEq)]
pub struct MapSelection {
    /// Resolved place name (or the unavailable sentinel)
    pub place: String,
    /// Great-circle distance from the shop in meters
    pub meters: f64,
    /// The tapped coordinate
    pub coord: Coordinate,
}

/// Configuration for [`LocationSearchService`]
#[derive(Debug, Clone)]
pub struct LocationConfig {
    /// How long input must be stable before a search is issued
    pub debounce: Duration,
    /// Reference point distances are measured from (the shop)
    pub origin: Coordinate,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            // Flagship store, Pekanbaru.
            origin: Coordinate::new(0.4594, 101.4526),
        }
    }
}

impl LocationConfig {
    /// Create a config with the given shop origin
    pub fn new(origin: Coordinate) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    /// Set the debounce interval
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

struct SearchState {
    raw_text: String,
    last_issued: Option<String>,
    phase: SearchPhase,
    /// Bumped on every keystroke; a debounce timer only fires for the
    /// sequence number it was started with, so restarting the timer
    /// invalidates every earlier one.
    timer_seq: u64,
    cache: HashMap<String, String>,
    last_region: Option<String>,
}

/// Debounced location search with reverse-geocode caching
pub struct LocationSearchService {
    backend: Arc<dyn GeocodeApi>,
    config: LocationConfig,
    state: Arc<Mutex<SearchState>>,
    results_tx: watch::Sender<SearchResults>,
    epoch: Arc<AtomicU64>,
    debounce_task: Mutex<Option<JoinHandle<()>>>,
}

impl LocationSearchService {
    /// Create a service over the given geocoding backend
    pub fn new(backend: Arc<dyn GeocodeApi>, config: LocationConfig) -> Self {
        let (results_tx, _) = watch::channel(SearchResults::default());
        Self {
            backend,
            config,
            state: Arc::new(Mutex::new(SearchState {
                raw_text: String::new(),
                last_issued: None,
                phase: SearchPhase::Idle,
                timer_seq: 0,
                cache: HashMap::new(),
                last_region: None,
            })),
            results_tx,
            epoch: Arc::new(AtomicU64::new(0)),
            debounce_task: Mutex::new(None),
        }
    }

    /// Record a keystroke, restarting the debounce timer
    ///
    /// Must be called inside a tokio runtime; the timer is a spawned task.
    /// A request already in flight is not cancelled; its response is
    /// discarded by the `last_issued` guard if the text moved on.
    pub fn on_text_change(&self, text: impl Into<String>) {
        let my_seq = {
            let mut state = self.state.lock();
            state.raw_text = text.into();
            state.phase = SearchPhase::Debouncing;
            state.timer_seq += 1;
            state.timer_seq
        };

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let results_tx = self.results_tx.clone();
        let epoch = Arc::clone(&self.epoch);
        let issued_epoch = epoch.load(Ordering::SeqCst);
        let delay = self.config.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if epoch.load(Ordering::SeqCst) != issued_epoch {
                return;
            }

            let text = {
                let mut state = state.lock();
                if state.timer_seq != my_seq {
                    // A newer keystroke restarted the timer.
                    return;
                }
                if state.raw_text.is_empty() {
                    state.phase = SearchPhase::Idle;
                    state.last_issued = None;
                    drop(state);
                    results_tx.send_replace(SearchResults::default());
                    return;
                }
                state.phase = SearchPhase::Querying;
                state.last_issued = Some(state.raw_text.clone());
                state.raw_text.clone()
            };

            let outcome = backend.search(&text).await;
            if epoch.load(Ordering::SeqCst) != issued_epoch {
                return;
            }

            let mut state = state.lock();
            if state.raw_text != text {
                // A newer request supersedes this response.
                tracing::debug!("discarding stale geocode response for \"{}\"", text);
                return;
            }
            state.phase = SearchPhase::Idle;
            drop(state);

            match outcome {
                Ok(hits) => {
                    results_tx.send_replace(SearchResults { query: text, hits });
                }
                Err(e) => {
                    // Keep the previous results on screen.
                    tracing::warn!("geocode search \"{}\" failed: {}", text, e);
                }
            }
        });
        // Dropping the previous handle detaches it; its timer check makes
        // the superseded fire a no-op.
        *self.debounce_task.lock() = Some(handle);
    }

    /// Resolve a coordinate to a place name, serving repeats from cache
    ///
    /// Failures return [`PLACE_NAME_UNAVAILABLE`] and are not cached, so a
    /// later attempt retries the backend.
    pub async fn reverse_geocode(&self, coord: Coordinate) -> String {
        let key = region_key(coord);
        if let Some(name) = self.state.lock().cache.get(&key).cloned() {
            return name;
        }

        match self.backend.reverse(coord).await {
            Ok(name) => {
                self.state.lock().cache.insert(key, name.clone());
                name
            }
            Err(e) => {
                tracing::warn!("reverse geocode {} failed: {}", key, e);
                PLACE_NAME_UNAVAILABLE.to_string()
            }
        }
    }

    /// Great-circle distance in meters from the configured shop origin
    pub fn distance_to(&self, coord: Coordinate) -> f64 {
        haversine_meters(self.config.origin, coord)
    }

    /// Handle a map tap
    ///
    /// Returns `None` when the tap lands in the same rounded region as the
    /// previous one, so re-renders of an unchanged map cause no work.
    pub async fn handle_map_tap(&self, coord: Coordinate) -> Option<MapSelection> {
        let key = region_key(coord);
        {
            let mut state = self.state.lock();
            if state.last_region.as_deref() == Some(key.as_str()) {
                return None;
            }
            state.last_region = Some(key);
        }

        let place = self.reverse_geocode(coord).await;
        Some(MapSelection {
            place,
            meters: self.distance_to(coord),
            coord,
        })
    }

    /// Current phase of the search state machine
    pub fn phase(&self) -> SearchPhase {
        self.state.lock().phase
    }

    /// Subscribe to search results
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results_tx.subscribe()
    }

    /// Number of cached reverse-geocode entries
    pub fn cached_regions(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Drop every cached reverse-geocode entry
    pub fn clear_cache(&self) {
        self.state.lock().cache.clear();
    }

    /// Cancel the pending timer and detach any in-flight work
    ///
    /// After a reset no previously scheduled debounce fire or response can
    /// mutate state. Also invoked on `Drop`.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.debounce_task.lock().take() {
            task.abort();
        }
        let mut state = self.state.lock();
        state.raw_text.clear();
        state.last_issued = None;
        state.phase = SearchPhase::Idle;
    }
}

impl Drop for LocationSearchService {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.debounce_task.lock().take() {
            task.abort();
        }
    }
}

/// Round a coordinate into its cache/region key
fn region_key(coord: Coordinate) -> String {
    format!(
        "{:.prec$},{:.prec$}",
        coord.lat,
        coord.lon,
        prec = KEY_DECIMALS
    )
}

/// Great-circle distance between two coordinates in meters (haversine)
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Format a distance in meters as kilometers with two decimals
pub fn format_km(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}
