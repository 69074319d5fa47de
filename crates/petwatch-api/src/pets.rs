// Pet endpoints: listing, per-pet location, and collar writes.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::PetClient;
use crate::error::Error;
use crate::location::{FetchFailure, Location};
use crate::models::{
    ConnectionState, CurrentUserData, OngoingActivity, Pet, PetLocationData, PetMode, Position,
    RawPet, UpdateOperationParamsData,
};
use crate::queries;

impl PetClient {
    /// Fetch every pet of the logged-in user, with a location for each.
    ///
    /// Logs in lazily. Either the full list is returned or an error is
    /// raised; location failures never fail the list (see
    /// [`fetch_location`](Self::fetch_location)).
    pub async fn list_pets(&self) -> Result<Vec<Pet>, Error> {
        self.ensure_authenticated().await?;

        let data: Option<CurrentUserData> =
            self.graphql(queries::CURRENT_USER_PETS, None).await?;

        // A missing user means the response is unusable, not that the
        // account has no pets.
        let households = data
            .and_then(|d| d.current_user)
            .and_then(|u| u.user_households)
            .ok_or_else(|| Error::Deserialization {
                message: "pet list response has no currentUser households".into(),
                body: String::new(),
            })?;

        let mut pets = Vec::new();
        for raw in households
            .into_iter()
            .filter_map(|uh| uh.household)
            .flat_map(|h| h.pets.unwrap_or_default())
        {
            let Some(pet) = pet_without_location(raw) else {
                continue;
            };
            let location = self.fetch_location(&pet.pet_id).await;
            pets.push(Pet { location, ..pet });
        }

        debug!(count = pets.len(), "retrieved pets");
        Ok(pets)
    }

    /// Fetch the current location of one pet.
    ///
    /// On success the pet's cache entry is overwritten before returning.
    /// On any failure the last cached location is returned, or the neutral
    /// location if none was ever fetched. Never fails.
    pub async fn fetch_location(&self, pet_id: &str) -> Location {
        match self.query_location(pet_id).await {
            Ok(location) => {
                self.location_cache().store(pet_id, location.clone());
                location
            }
            Err(err) => {
                let cache = self.location_cache();
                FetchFailure::classify(&err).log(pet_id, &err, cache.get(pet_id).is_some());
                cache.fallback(pet_id)
            }
        }
    }

    async fn query_location(&self, pet_id: &str) -> Result<Location, Error> {
        self.ensure_authenticated().await?;

        let data: Option<PetLocationData> = self
            .graphql(queries::PET_LOCATION, Some(json!({ "petId": pet_id })))
            .await?;

        let activity = data
            .and_then(|d| d.pet)
            .and_then(|p| p.ongoing_activity)
            .ok_or_else(|| Error::Deserialization {
                message: format!("no ongoing activity for pet {pet_id}"),
                body: String::new(),
            })?;

        Ok(location_from_activity(activity))
    }

    /// Turn the collar light on or off.
    pub async fn set_led(&self, module_id: &str, enabled: bool) -> Result<(), Error> {
        self.update_operation_params(json!({ "moduleId": module_id, "ledEnabled": enabled }))
            .await?;
        debug!(module = module_id, enabled, "set collar light");
        Ok(())
    }

    /// Switch the collar between normal and lost-dog mode.
    pub async fn set_lost_mode(&self, module_id: &str, lost: bool) -> Result<(), Error> {
        let mode = if lost { PetMode::LostDog } else { PetMode::Normal };
        self.update_operation_params(json!({ "moduleId": module_id, "mode": mode.as_str() }))
            .await?;
        debug!(module = module_id, mode = mode.as_str(), "set collar mode");
        Ok(())
    }

    async fn update_operation_params(&self, input: Value) -> Result<(), Error> {
        self.ensure_authenticated().await?;
        let data: Option<UpdateOperationParamsData> = self
            .graphql(
                queries::UPDATE_OPERATION_PARAMS,
                Some(json!({ "input": input })),
            )
            .await?;

        match data.and_then(|d| d.update_device_operation_params) {
            Some(Value::Null) | None => Err(Error::GraphQl {
                message: "device operation params were not updated".into(),
            }),
            Some(_) => Ok(()),
        }
    }
}

// ── Mapping ──────────────────────────────────────────────────────────

/// Flatten a raw pet into a `Pet` with a neutral location.
/// Pets without a collar are skipped.
fn pet_without_location(raw: RawPet) -> Option<Pet> {
    let Some(device) = raw.device else {
        warn!(pet = %raw.name, "pet has no device, skipping");
        return None;
    };

    let info = device.info.unwrap_or(Value::Null);
    let battery_percent = parse_battery(info.get("batteryPercent"));
    let info_charging = info
        .get("isCharging")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let (on_base, connected_to_user) = match device.last_connection_state {
        Some(ConnectionState::ConnectedToBase) => (true, None),
        Some(ConnectionState::ConnectedToUser { user }) => (false, user.and_then(|u| u.first_name)),
        Some(ConnectionState::Other) | None => (false, None),
    };

    let params = device.operation_params;
    let mode = match params.as_ref().and_then(|p| p.mode.as_deref()) {
        Some(raw_mode) => PetMode::from_wire(raw_mode).unwrap_or_else(|| {
            debug!(pet = %raw.name, mode = raw_mode, "unknown collar mode, assuming NORMAL");
            PetMode::Normal
        }),
        None => PetMode::Normal,
    };

    Some(Pet {
        pet_id: raw.id,
        name: raw.name,
        breed: raw.breed.and_then(|b| b.name),
        device_id: device.id,
        module_id: device.module_id,
        battery_percent,
        is_charging: info_charging || on_base,
        led_enabled: params.and_then(|p| p.led_enabled).unwrap_or(false),
        mode,
        connected_to_user,
        location: Location::default(),
    })
}

/// Battery percentage arrives as a number or a numeric string.
/// Anything unreadable reads as 0; values are clamped to 0..=100.
fn parse_battery(value: Option<&Value>) -> u8 {
    let percent = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    percent.map_or(0, |p| {
        let clamped = p.clamp(0.0, 100.0).trunc();
        // Clamped to 0..=100 above, so the conversion is lossless.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        let percent = clamped as u8;
        percent
    })
}

fn coordinates(position: Option<&Position>) -> (f64, f64) {
    position.map_or((0.0, 0.0), |p| {
        (p.latitude.unwrap_or(0.0), p.longitude.unwrap_or(0.0))
    })
}

fn location_from_activity(activity: OngoingActivity) -> Location {
    match activity {
        OngoingActivity::OngoingRest {
            area_name,
            position,
            place,
        } => {
            let (latitude, longitude) = coordinates(position.as_ref());
            let (place_name, place_address) =
                place.map_or((None, None), |p| (p.name, p.address));
            Location {
                latitude,
                longitude,
                area_name,
                place_name,
                place_address,
            }
        }
        OngoingActivity::OngoingWalk {
            area_name,
            positions,
        } => {
            let last = positions.as_ref().and_then(|ps| ps.last());
            let (latitude, longitude) = coordinates(last.and_then(|wp| wp.position.as_ref()));
            Location {
                latitude,
                longitude,
                area_name,
                place_name: None,
                place_address: None,
            }
        }
        OngoingActivity::Other => Location::default(),
    }
}
