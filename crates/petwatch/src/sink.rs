//! Accessory sink that reports collar state through `tracing`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use petwatch_core::{AccessorySink, DeviceId, DeviceSnapshot, EscapeAlertType, EscapeStatus};

#[derive(Debug, Default)]
struct PetView {
    name: String,
    low_battery: bool,
}

/// Logs every accessory notification. The escape alarm is phrased as
/// the configured alert type, the way a leak or motion sensor would
/// report it.
#[derive(Debug)]
pub struct LogSink {
    alert: EscapeAlertType,
    pets: Mutex<HashMap<DeviceId, PetView>>,
}

impl LogSink {
    pub fn new(alert: EscapeAlertType) -> Self {
        Self {
            alert,
            pets: Mutex::new(HashMap::new()),
        }
    }

    pub fn alarm_text(&self, raised: bool) -> &'static str {
        match (self.alert, raised) {
            (EscapeAlertType::Leak, true) => "leak detected",
            (EscapeAlertType::Leak, false) => "no leak",
            (EscapeAlertType::Motion, true) => "motion detected",
            (EscapeAlertType::Motion, false) => "no motion",
        }
    }

    fn name_of(&self, id: &DeviceId) -> String {
        self.pets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    /// Record the latest reading; returns true when the battery just
    /// crossed into the low range.
    fn track(&self, device: &DeviceSnapshot) -> bool {
        let mut pets = self.pets.lock().unwrap_or_else(PoisonError::into_inner);
        let view = pets.entry(device.id.clone()).or_default();
        view.name.clone_from(&device.name);
        let was_low = std::mem::replace(&mut view.low_battery, device.is_low_battery());
        view.low_battery && !was_low
    }
}

impl AccessorySink for LogSink {
    fn device_added(&self, device: &DeviceSnapshot) {
        info!(
            device = %device.id,
            pet = %device.name,
            breed = device.breed.as_deref().unwrap_or("-"),
            "collar accessory added"
        );
    }

    fn device_removed(&self, id: &DeviceId) {
        let name = self.name_of(id);
        self.pets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        info!(device = %id, pet = %name, "collar accessory removed");
    }

    fn snapshot_updated(&self, device: &DeviceSnapshot, escape: EscapeStatus) {
        if self.track(device) {
            warn!(
                device = %device.id,
                pet = %device.name,
                battery = device.battery_percent,
                "collar battery low"
            );
        }
        debug!(
            device = %device.id,
            pet = %device.name,
            battery = device.battery_percent,
            charging = device.is_charging,
            light = device.light_on,
            mode = %device.mode,
            place = device.safe_place().unwrap_or("-"),
            companion = device.companion.as_deref().unwrap_or("-"),
            ?escape,
            alarm = self.alarm_text(escape.is_confirmed()),
            "collar updated"
        );
    }

    fn escape_confirmed(&self, id: &DeviceId) {
        warn!(device = %id, pet = %self.name_of(id), "{}", self.alarm_text(true));
    }

    fn escape_cleared(&self, id: &DeviceId) {
        info!(device = %id, pet = %self.name_of(id), "{}", self.alarm_text(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petwatch_core::{Location, PetMode};

    fn collar(battery: u8) -> DeviceSnapshot {
        DeviceSnapshot {
            id: DeviceId::from("pet-1"),
            name: "Rex".into(),
            breed: None,
            collar_id: "collar-1".into(),
            module_id: "module-1".into(),
            battery_percent: battery,
            is_charging: false,
            light_on: false,
            mode: PetMode::Normal,
            companion: None,
            location: Location::default(),
            observed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn alarm_text_follows_alert_type() {
        assert_eq!(LogSink::new(EscapeAlertType::Leak).alarm_text(true), "leak detected");
        assert_eq!(LogSink::new(EscapeAlertType::Motion).alarm_text(true), "motion detected");
        assert_eq!(LogSink::new(EscapeAlertType::Motion).alarm_text(false), "no motion");
    }

    #[test]
    fn low_battery_reported_on_crossing_only() {
        let sink = LogSink::new(EscapeAlertType::Leak);
        assert!(!sink.track(&collar(80)));
        assert!(sink.track(&collar(15)));
        assert!(!sink.track(&collar(10)));
        assert!(!sink.track(&collar(90)));
        assert!(sink.track(&collar(5)));
    }

    #[test]
    fn names_survive_until_removal() {
        let sink = LogSink::new(EscapeAlertType::Leak);
        sink.track(&collar(80));
        assert_eq!(sink.name_of(&DeviceId::from("pet-1")), "Rex");
        sink.device_removed(&DeviceId::from("pet-1"));
        assert_eq!(sink.name_of(&DeviceId::from("pet-1")), "pet-1");
    }
}
