// ── Domain model ──
//
// Canonical collar state as the rest of the system sees it. Refreshed
// wholesale on every successful poll; the accessory layer reads it
// through `TrackedDevice`, which pairs it with the escape status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::escape::EscapeStatus;

pub use petwatch_api::Location;

/// Battery percentage below which the collar reports a low battery.
pub const LOW_BATTERY_PERCENT: u8 = 20;

// ── DeviceId ────────────────────────────────────────────────────────

/// Stable identifier of one tracked pet/collar pair.
///
/// The same key addresses the registry, the escape state, and the remote
/// client's location cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── PetMode ─────────────────────────────────────────────────────────

/// Collar operating mode. Lost mode is a user-facing toggle only; it does
/// not suppress or force escape alarms.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PetMode {
    #[default]
    Normal,
    LostDog,
}

impl PetMode {
    pub fn is_lost(self) -> bool {
        matches!(self, Self::LostDog)
    }
}

// ── DeviceSnapshot ──────────────────────────────────────────────────

/// One tracked animal and its collar, as of the last successful poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub name: String,
    pub breed: Option<String>,
    /// Collar hardware id (`device.id` on the service side).
    pub collar_id: String,
    /// Module id; the key the service expects for writes.
    pub module_id: String,
    pub battery_percent: u8,
    pub is_charging: bool,
    pub light_on: bool,
    pub mode: PetMode,
    /// Name of the companion the collar is connected to, if any.
    pub companion: Option<String>,
    pub location: Location,
    pub observed_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    /// Outside every known safe place and not with any companion.
    pub fn is_escaped(&self) -> bool {
        self.location.place_name.is_none() && self.companion.is_none()
    }

    pub fn is_low_battery(&self) -> bool {
        self.battery_percent < LOW_BATTERY_PERCENT
    }

    pub fn safe_place(&self) -> Option<&str> {
        self.location.place_name.as_deref()
    }
}

// ── TrackedDevice ───────────────────────────────────────────────────

/// A snapshot together with the escape status derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedDevice {
    pub snapshot: DeviceSnapshot,
    pub escape: EscapeStatus,
}

impl TrackedDevice {
    pub fn id(&self) -> &DeviceId {
        &self.snapshot.id
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn snapshot(id: &str, place: Option<&str>, companion: Option<&str>) -> DeviceSnapshot {
        DeviceSnapshot {
            id: DeviceId::from(id),
            name: format!("pet {id}"),
            breed: None,
            collar_id: format!("collar-{id}"),
            module_id: format!("module-{id}"),
            battery_percent: 80,
            is_charging: false,
            light_on: false,
            mode: PetMode::Normal,
            companion: companion.map(String::from),
            location: Location {
                place_name: place.map(String::from),
                ..Location::default()
            },
            observed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::snapshot;
    use super::*;
    use std::str::FromStr;

    #[test]
    fn escaped_only_without_place_and_companion() {
        assert!(snapshot("a", None, None).is_escaped());
        assert!(!snapshot("a", Some("Yard"), None).is_escaped());
        assert!(!snapshot("a", None, Some("Sam")).is_escaped());
        assert!(!snapshot("a", Some("Yard"), Some("Sam")).is_escaped());
    }

    #[test]
    fn lost_mode_does_not_affect_escape() {
        let mut snap = snapshot("a", Some("Yard"), None);
        snap.mode = PetMode::LostDog;
        assert!(!snap.is_escaped());
    }

    #[test]
    fn low_battery_threshold() {
        let mut snap = snapshot("a", None, None);
        snap.battery_percent = 19;
        assert!(snap.is_low_battery());
        snap.battery_percent = 20;
        assert!(!snap.is_low_battery());
    }

    #[test]
    fn pet_mode_wire_spelling() {
        assert_eq!(PetMode::LostDog.to_string(), "LOST_DOG");
        assert_eq!(PetMode::from_str("NORMAL").ok(), Some(PetMode::Normal));
    }
}
