#![allow(clippy::unwrap_used)]
// Integration tests for `PetClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use petwatch_api::{Error, Location, PetClient, PetMode};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PetClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PetClient::with_client(
        reqwest::Client::new(),
        base_url,
        "owner@example.com",
        "hunter2".to_string().into(),
    );
    (server, client)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "userId": "user-1", "sessionId": "sess-1" })),
        )
        .mount(server)
        .await;
}

fn rest_at(place: Option<&str>) -> Value {
    json!({
        "data": {
            "pet": {
                "ongoingActivity": {
                    "__typename": "OngoingRest",
                    "start": "2024-06-15T10:00:00Z",
                    "areaName": "Downtown",
                    "position": { "latitude": 51.5, "longitude": -0.12 },
                    "place": place.map(|name| json!({ "id": "pl-1", "name": name, "address": "1 Main St" }))
                }
            }
        }
    })
}

fn pets_body() -> Value {
    json!({
        "data": {
            "currentUser": {
                "__typename": "User",
                "id": "user-1",
                "userHouseholds": [{
                    "household": {
                        "pets": [
                            {
                                "id": "pet-1",
                                "name": "Biscuit",
                                "breed": { "id": "b1", "name": "Corgi" },
                                "device": {
                                    "id": "dev-1",
                                    "moduleId": "mod-1",
                                    "info": { "batteryPercent": 81, "isCharging": false },
                                    "operationParams": { "mode": "NORMAL", "ledEnabled": false },
                                    "lastConnectionState": {
                                        "__typename": "ConnectedToCellular",
                                        "date": "2024-06-15T10:00:00Z",
                                        "signalStrengthPercent": 60
                                    }
                                }
                            },
                            { "id": "pet-2", "name": "Ghost", "device": null }
                        ]
                    }
                }]
            }
        }
    })
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_stores_session() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    let session = client.login().await.unwrap();

    assert_eq!(session.user_id, "user-1");
    assert_eq!(session.expose_session_id(), "sess-1");
    assert!(client.has_session());
}

#[tokio::test]
async fn test_login_error_body_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "error": { "message": "bad password" } })),
        )
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(
        matches!(result, Err(Error::Authentication { ref message }) if message == "bad password"),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_login_missing_session_fields() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "userId": "user-1" })))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_login_http_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

// ── Pet listing ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_pets_logs_in_lazily_and_maps_fields() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("currentUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pets_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("ongoingActivity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_at(Some("Home"))))
        .mount(&server)
        .await;

    assert!(!client.has_session());
    let pets = client.list_pets().await.unwrap();
    assert!(client.has_session());

    assert_eq!(pets.len(), 1, "pet without a device is skipped");
    let pet = &pets[0];
    assert_eq!(pet.pet_id, "pet-1");
    assert_eq!(pet.module_id, "mod-1");
    assert_eq!(pet.battery_percent, 81);
    assert_eq!(pet.mode, PetMode::Normal);
    assert!(pet.connected_to_user.is_none());
    assert_eq!(pet.location.place_name.as_deref(), Some("Home"));
    assert_eq!(client.location_cache().len(), 1);
}

#[tokio::test]
async fn test_list_pets_graphql_error_fails_whole_list() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errors": [{ "message": "internal failure" }] })),
        )
        .mount(&server)
        .await;

    let result = client.list_pets().await;
    assert!(
        matches!(result, Err(Error::GraphQl { ref message }) if message == "internal failure"),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_pets_busy_server_is_transient() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.list_pets().await.unwrap_err();
    assert!(err.is_transient(), "got: {err:?}");
}

#[tokio::test]
async fn test_list_pets_null_data_is_malformed() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let result = client.list_pets().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_pets_without_current_user_is_malformed() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "currentUser": null } })),
        )
        .mount(&server)
        .await;

    let result = client.list_pets().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_pets_empty_households_is_empty_list() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "currentUser": { "id": "user-1", "userHouseholds": [] } }
        })))
        .mount(&server)
        .await;

    let pets = client.list_pets().await.unwrap();
    assert!(pets.is_empty());
}

#[tokio::test]
async fn test_busy_pet_list_leaves_location_cache_untouched() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("ongoingActivity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_at(Some("Yard"))))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("currentUser"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let seeded = client.fetch_location("pet-1").await;
    assert_eq!(client.location_cache().get("pet-1"), Some(seeded.clone()));

    let err = client.list_pets().await.unwrap_err();
    assert!(err.is_transient(), "got: {err:?}");
    assert_eq!(client.location_cache().get("pet-1"), Some(seeded));
    assert_eq!(client.location_cache().len(), 1);
}

#[tokio::test]
async fn test_rejected_session_is_cleared() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_pets().await.unwrap_err();
    assert!(err.is_auth_expired());
    assert!(!client.has_session());
}

// ── Location fallback ───────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_location_falls_back_to_cache() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_at(Some("Yard"))))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let first = client.fetch_location("pet-1").await;
    assert_eq!(first.place_name.as_deref(), Some("Yard"));

    let second = client.fetch_location("pet-1").await;
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_fetch_location_without_cache_is_neutral() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let location = client.fetch_location("pet-1").await;
    assert_eq!(location, Location::default());
    assert!(client.location_cache().is_empty());
}

#[tokio::test]
async fn test_successful_fetch_overwrites_cache() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_at(Some("Yard"))))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_at(None)))
        .mount(&server)
        .await;

    client.fetch_location("pet-1").await;
    let latest = client.fetch_location("pet-1").await;

    assert!(latest.place_name.is_none());
    assert_eq!(client.location_cache().get("pet-1"), Some(latest));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_led_success() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("ledEnabled\":true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "updateDeviceOperationParams": {
                    "id": "dev-1",
                    "moduleId": "mod-1",
                    "operationParams": { "mode": "NORMAL", "ledEnabled": true }
                }
            }
        })))
        .mount(&server)
        .await;

    client.set_led("mod-1", true).await.unwrap();
}

#[tokio::test]
async fn test_set_lost_mode_surfaces_error() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("LOST_DOG"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errors": [{ "message": "module offline" }] })),
        )
        .mount(&server)
        .await;

    let result = client.set_lost_mode("mod-1", true).await;
    assert!(
        matches!(result, Err(Error::GraphQl { ref message }) if message == "module offline"),
        "got: {result:?}"
    );
}
