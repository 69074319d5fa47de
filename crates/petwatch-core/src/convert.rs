// ── API → domain conversion ──

use chrono::Utc;

use crate::model::{DeviceId, DeviceSnapshot, PetMode};

impl From<petwatch_api::PetMode> for PetMode {
    fn from(mode: petwatch_api::PetMode) -> Self {
        match mode {
            petwatch_api::PetMode::Normal => Self::Normal,
            petwatch_api::PetMode::LostDog => Self::LostDog,
        }
    }
}

impl From<petwatch_api::Pet> for DeviceSnapshot {
    fn from(pet: petwatch_api::Pet) -> Self {
        Self {
            id: DeviceId::from(pet.pet_id),
            name: pet.name,
            breed: pet.breed,
            collar_id: pet.device_id,
            module_id: pet.module_id,
            battery_percent: pet.battery_percent.min(100),
            is_charging: pet.is_charging,
            light_on: pet.led_enabled,
            mode: pet.mode.into(),
            companion: pet.connected_to_user,
            location: pet.location,
            observed_at: Utc::now(),
        }
    }
}
