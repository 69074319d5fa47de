// ── Wire and result models ──
//
// Raw GraphQL response shapes (crate-private) plus the flattened `Pet`
// record handed to consumers. Only the fields the client actually reads
// are modelled; everything else in the payload is ignored.

use serde::{Deserialize, Serialize};

use crate::location::Location;

// ── Public result types ─────────────────────────────────────────────

/// Collar operating mode as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetMode {
    #[default]
    Normal,
    LostDog,
}

impl PetMode {
    /// The wire spelling used in queries and mutations.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::LostDog => "LOST_DOG",
        }
    }

    /// Parse the wire spelling. Returns `None` for modes this client
    /// does not know about.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "NORMAL" => Some(Self::Normal),
            "LOST_DOG" => Some(Self::LostDog),
            _ => None,
        }
    }
}

/// One tracked pet with its collar state and latest location, flattened
/// from the current-user query plus a per-pet location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub pet_id: String,
    pub name: String,
    pub breed: Option<String>,
    pub device_id: String,
    pub module_id: String,
    pub battery_percent: u8,
    pub is_charging: bool,
    pub led_enabled: bool,
    pub mode: PetMode,
    /// First name of the user the collar is currently connected to.
    pub connected_to_user: Option<String>,
    pub location: Location,
}

// ── GraphQL envelope ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

// ── Login ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub error: Option<LoginError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginError {
    pub message: Option<String>,
}

// ── Current user / pets ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentUserData {
    pub current_user: Option<CurrentUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentUser {
    pub user_households: Option<Vec<UserHousehold>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserHousehold {
    pub household: Option<Household>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Household {
    pub pets: Option<Vec<RawPet>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPet {
    pub id: String,
    pub name: String,
    pub breed: Option<Breed>,
    pub device: Option<RawDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Breed {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDevice {
    pub id: String,
    pub module_id: String,
    /// Free-form JSON object; battery fields arrive as numbers or strings.
    pub info: Option<serde_json::Value>,
    pub operation_params: Option<OperationParams>,
    pub last_connection_state: Option<ConnectionState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationParams {
    pub mode: Option<String>,
    pub led_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(crate) enum ConnectionState {
    ConnectedToUser { user: Option<ConnectedUser> },
    ConnectedToBase,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectedUser {
    pub first_name: Option<String>,
}

// ── Location ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct PetLocationData {
    pub pet: Option<PetActivity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PetActivity {
    pub ongoing_activity: Option<OngoingActivity>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(crate) enum OngoingActivity {
    #[serde(rename_all = "camelCase")]
    OngoingRest {
        area_name: Option<String>,
        position: Option<Position>,
        place: Option<Place>,
    },
    #[serde(rename_all = "camelCase")]
    OngoingWalk {
        area_name: Option<String>,
        positions: Option<Vec<WalkPosition>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Position {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WalkPosition {
    pub position: Option<Position>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Place {
    pub name: Option<String>,
    pub address: Option<String>,
}

// ── Mutations ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateOperationParamsData {
    pub update_device_operation_params: Option<serde_json::Value>,
}
