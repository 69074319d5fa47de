// ── Location data and the per-pet fallback cache ──
//
// A failed location fetch must never look like the pet left its safe
// zone. The cache holds the last good reading per pet and is served back
// whenever a fetch fails.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Error;

/// Position and place information for one pet.
///
/// `Location::default()` is the neutral reading: zero coordinates and no
/// place fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Free-text area name reported by the service (neighbourhood, park).
    pub area_name: Option<String>,
    /// Safe place name. `None` means the pet is not inside any known place.
    pub place_name: Option<String>,
    pub place_address: Option<String>,
}

/// Classification of a failed location fetch, used to pick the log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    ServerBusy,
    Other,
}

impl FetchFailure {
    pub fn classify(err: &Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if matches!(err, Error::ServerBusy { .. }) {
            Self::ServerBusy
        } else {
            Self::Other
        }
    }

    /// Timeouts and busy servers happen routinely and are logged quietly.
    pub fn is_expected(self) -> bool {
        matches!(self, Self::Timeout | Self::ServerBusy)
    }

    pub(crate) fn log(self, pet_id: &str, err: &Error, cached: bool) {
        if self.is_expected() {
            debug!(pet = pet_id, failure = ?self, cached, error = %err, "location fetch failed");
        } else {
            warn!(pet = pet_id, failure = ?self, cached, error = %err, "location fetch failed");
        }
    }
}

/// Last successfully retrieved location per pet id.
///
/// Written only after a successful fetch; read only as a fallback.
#[derive(Debug, Default)]
pub struct LocationCache {
    entries: DashMap<String, Location>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pet_id: &str) -> Option<Location> {
        self.entries.get(pet_id).map(|e| e.value().clone())
    }

    /// Overwrite the entry for `pet_id` unconditionally.
    pub fn store(&self, pet_id: &str, location: Location) {
        self.entries.insert(pet_id.to_owned(), location);
    }

    /// Drop the entry for a pet that no longer exists.
    pub fn remove(&self, pet_id: &str) -> Option<Location> {
        self.entries.remove(pet_id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cached location, or the neutral reading if none was ever stored.
    pub fn fallback(&self, pet_id: &str) -> Location {
        self.get(pet_id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yard() -> Location {
        Location {
            latitude: 40.7,
            longitude: -74.0,
            area_name: Some("Brooklyn".into()),
            place_name: Some("Yard".into()),
            place_address: Some("1 Main St".into()),
        }
    }

    #[test]
    fn fallback_without_entry_is_neutral() {
        let cache = LocationCache::new();
        let loc = cache.fallback("pet-1");
        assert_eq!(loc, Location::default());
        assert!(loc.place_name.is_none());
    }

    #[test]
    fn store_overwrites() {
        let cache = LocationCache::new();
        cache.store("pet-1", yard());
        cache.store("pet-1", Location::default());
        assert_eq!(cache.get("pet-1"), Some(Location::default()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_drops_entry() {
        let cache = LocationCache::new();
        cache.store("pet-1", yard());
        assert_eq!(cache.remove("pet-1"), Some(yard()));
        assert!(cache.is_empty());
    }

    #[test]
    fn busy_server_is_expected_failure() {
        let failure = FetchFailure::classify(&Error::ServerBusy { status: 503 });
        assert_eq!(failure, FetchFailure::ServerBusy);
        assert!(failure.is_expected());
    }

    #[test]
    fn graphql_error_is_unexpected_failure() {
        let failure = FetchFailure::classify(&Error::GraphQl {
            message: "nope".into(),
        });
        assert_eq!(failure, FetchFailure::Other);
        assert!(!failure.is_expected());
    }
}
