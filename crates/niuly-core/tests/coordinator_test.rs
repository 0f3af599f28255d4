#![allow(clippy::unwrap_used)]
// Coordinator, reading and entry behaviour against a wiremock vendor API.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use niuly_core::{
    Coordinator, CoreError, Credentials, EntryConfig, ReadingKind, RefreshPhase, VehicleEntry,
    readings_for, reauthenticate_entry, validate_entry,
};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN_PATH: &str = "/v1/oauth2/token";
const STATUS_PATH: &str = "/v3/vehicle/N1ABC/status";

fn entry_config(server: &MockServer, scan_interval: Duration) -> EntryConfig {
    let mut config = EntryConfig::new(
        Credentials::new("rider", "pw".to_string().into(), "N1ABC"),
        Url::parse(&server.uri()).unwrap(),
    );
    config.scan_interval = scan_interval;
    config
}

fn coordinator(server: &MockServer) -> Coordinator {
    Coordinator::from_entry(&entry_config(server, Duration::ZERO), reqwest::Client::new()).unwrap()
}

fn coordinator_with_timeout(server: &MockServer, timeout: Duration) -> Coordinator {
    let http = reqwest::Client::builder().timeout(timeout).build().unwrap();
    Coordinator::from_entry(&entry_config(server, Duration::ZERO), http).unwrap()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "T1" })))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, template: ResponseTemplate, times: Option<u64>) {
    let mock = Mock::given(method("GET")).and(path(STATUS_PATH)).respond_with(template);
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

async fn requests_to(server: &MockServer, target: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == target)
        .count()
}

// ── Refresh outcomes ────────────────────────────────────────────────

#[tokio::test]
async fn test_successful_refresh_replaces_cache() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let payload = json!({ "battery": { "level": 80 }, "speed": 12 });
    mount_status(&server, ResponseTemplate::new(200).set_body_json(&payload), None).await;

    let coordinator = coordinator(&server);
    let mut rx = coordinator.subscribe();

    coordinator.refresh().await.unwrap();

    let state = coordinator.state();
    assert_eq!(state.phase, RefreshPhase::Updated);
    assert!(state.last_update_success);
    assert!(state.last_update_time.is_some());
    assert!(state.last_error.is_none());
    assert_eq!(state.data.as_deref(), Some(&payload));
    assert!(rx.has_changed().unwrap(), "subscribers are notified on success");
    rx.borrow_and_update();
}

#[tokio::test]
async fn test_failed_refresh_keeps_stale_payload() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let payload = json!({ "range": 30.0 });
    mount_status(&server, ResponseTemplate::new(200).set_body_json(&payload), Some(1)).await;
    mount_status(&server, ResponseTemplate::new(500), None).await;

    let coordinator = coordinator(&server);
    coordinator.refresh().await.unwrap();
    let first_update = coordinator.state().last_update_time;

    let mut rx = coordinator.subscribe();
    let result = coordinator.refresh().await;

    assert!(
        matches!(result, Err(CoreError::UpdateFailed { .. })),
        "expected UpdateFailed, got {result:?}"
    );
    let state = coordinator.state();
    assert_eq!(state.phase, RefreshPhase::Failed);
    assert!(!state.last_update_success);
    assert_eq!(state.data.as_deref(), Some(&payload));
    assert_eq!(state.last_update_time, first_update);
    assert!(state.last_error.unwrap().contains("HTTP 500"));
    assert!(rx.has_changed().unwrap(), "subscribers are notified on failure");
}

#[tokio::test]
async fn test_failure_before_any_success_leaves_cache_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    let result = coordinator.refresh().await;

    assert!(matches!(result, Err(CoreError::UpdateFailed { .. })));
    assert!(coordinator.data().is_none());
    assert_eq!(requests_to(&server, STATUS_PATH).await, 0);
}

#[tokio::test]
async fn test_reauth_scenario_feeds_readings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "T1" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "T2" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .and(header("authorization", "Bearer T2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "battery": { "level": 72 }, "range": 45.5 })),
        )
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    let readings = readings_for(&coordinator);

    coordinator.refresh().await.unwrap();

    let value = |kind| readings.iter().find(|r| r.kind() == kind).unwrap().value();
    assert_eq!(value(ReadingKind::BatteryLevel), Some(72.0));
    assert_eq!(value(ReadingKind::Range), Some(45.5));
    assert_eq!(value(ReadingKind::Speed), None);
    assert!(readings.iter().all(niuly_core::Reading::available));
}

#[tokio::test]
async fn test_readings_stay_readable_but_unavailable_after_failure() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "mileage": 999.0 })),
        Some(1),
    )
    .await;
    mount_status(&server, ResponseTemplate::new(503), None).await;

    let coordinator = coordinator(&server);
    let readings = readings_for(&coordinator);
    let mileage = readings
        .iter()
        .find(|r| r.kind() == ReadingKind::Mileage)
        .unwrap();

    coordinator.refresh().await.unwrap();
    assert!(mileage.available());

    let _ = coordinator.refresh().await;
    assert!(!mileage.available());
    assert_eq!(mileage.value(), Some(999.0));

    let snap = mileage.snapshot();
    assert_eq!(snap.unique_id, "N1ABC_mileage");
    assert_eq!(snap.value, Some(999.0));
    assert!(!snap.available);
}

#[tokio::test]
async fn test_status_timeout_keeps_stale_payload() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let payload = json!({ "speed": 9 });
    mount_status(&server, ResponseTemplate::new(200).set_body_json(&payload), Some(1)).await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "speed": 99 }))
            .set_delay(Duration::from_millis(500)),
        None,
    )
    .await;

    let coordinator = coordinator_with_timeout(&server, Duration::from_millis(100));
    coordinator.refresh().await.unwrap();

    let result = coordinator.refresh().await;

    match result {
        Err(CoreError::UpdateFailed { message }) => {
            assert!(message.contains("Network error"), "message: {message}");
        }
        other => panic!("expected UpdateFailed, got {other:?}"),
    }
    let state = coordinator.state();
    assert!(!state.last_update_success);
    assert_eq!(state.data.as_deref(), Some(&payload));
}

// ── Concurrency ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_refreshes_share_one_fetch() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "speed": 5 }))
            .set_delay(Duration::from_millis(300)),
        None,
    )
    .await;

    let coordinator = coordinator(&server);

    let (a, b, c) = tokio::join!(
        coordinator.refresh(),
        coordinator.refresh(),
        coordinator.refresh()
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(requests_to(&server, TOKEN_PATH).await, 1);
    assert_eq!(requests_to(&server, STATUS_PATH).await, 1);
}

#[tokio::test]
async fn test_joined_refresh_reports_in_flight_failure() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(500).set_delay(Duration::from_millis(200)),
        None,
    )
    .await;

    let coordinator = coordinator(&server);
    let (a, b) = tokio::join!(coordinator.refresh(), coordinator.refresh());

    assert!(matches!(a, Err(CoreError::UpdateFailed { .. })));
    assert!(matches!(b, Err(CoreError::UpdateFailed { .. })));
    assert_eq!(requests_to(&server, STATUS_PATH).await, 1);
}

#[tokio::test]
async fn test_phase_is_refreshing_while_fetch_in_flight() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({}))
            .set_delay(Duration::from_millis(300)),
        None,
    )
    .await;

    let coordinator = coordinator(&server);
    let mut rx = coordinator.subscribe();
    let background = coordinator.clone();
    let handle = tokio::spawn(async move { background.refresh().await });

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(coordinator.state().phase, RefreshPhase::Refreshing);
    assert!(!rx.has_changed().unwrap(), "entering a refresh does not notify");

    handle.await.unwrap().unwrap();
    assert_eq!(coordinator.state().phase, RefreshPhase::Updated);
}

#[tokio::test]
async fn test_abandoned_refresh_restores_phase() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({}))
            .set_delay(Duration::from_millis(500)),
        None,
    )
    .await;

    let coordinator = coordinator(&server);
    let abandoned = tokio::time::timeout(Duration::from_millis(150), coordinator.refresh()).await;

    assert!(abandoned.is_err(), "refresh should still be in flight");
    assert_eq!(coordinator.state().phase, RefreshPhase::Uninitialized);

    coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.state().phase, RefreshPhase::Updated);
}

#[tokio::test]
async fn test_sequential_refreshes_each_fetch() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(json!({})), None).await;

    let coordinator = coordinator(&server);
    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap();

    assert_eq!(requests_to(&server, STATUS_PATH).await, 2);
    assert_eq!(requests_to(&server, TOKEN_PATH).await, 1);
}

// ── Scheduling & lifecycle ──────────────────────────────────────────

#[tokio::test]
async fn test_periodic_refresh_stops_on_shutdown() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(json!({})), None).await;

    let config = entry_config(&server, Duration::from_millis(100));
    let coordinator = Coordinator::from_entry(&config, reqwest::Client::new()).unwrap();

    coordinator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(450)).await;
    coordinator.shutdown().await;

    let after_shutdown = requests_to(&server, STATUS_PATH).await;
    assert!(after_shutdown >= 3, "expected first + periodic fetches, got {after_shutdown}");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(requests_to(&server, STATUS_PATH).await, after_shutdown);
    assert!(matches!(
        coordinator.refresh().await,
        Err(CoreError::ShutDown { .. })
    ));
}

#[tokio::test]
async fn test_start_retrying_recovers_from_failed_first_refresh() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(503), Some(1)).await;
    mount_status(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "range": 12.5 })),
        None,
    )
    .await;

    let config = entry_config(&server, Duration::from_millis(100));
    let coordinator = Coordinator::from_entry(&config, reqwest::Client::new()).unwrap();

    coordinator.start_retrying().await.unwrap();
    let state = coordinator.state();
    assert_eq!(state.phase, RefreshPhase::Failed);
    assert!(state.data.is_none());

    tokio::time::sleep(Duration::from_millis(350)).await;
    coordinator.shutdown().await;

    let state = coordinator.state();
    assert!(state.last_update_success);
    assert_eq!(state.data.as_deref(), Some(&json!({ "range": 12.5 })));
}

#[tokio::test]
async fn test_start_retrying_refused_after_shutdown() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);
    coordinator.shutdown().await;

    assert!(matches!(
        coordinator.start_retrying().await,
        Err(CoreError::ShutDown { .. })
    ));
    assert_eq!(requests_to(&server, TOKEN_PATH).await, 0);
}

#[tokio::test]
async fn test_reading_update_hook_refreshes() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "temperature": 21.5 })),
        None,
    )
    .await;

    let coordinator = coordinator(&server);
    let readings = readings_for(&coordinator);
    let temperature = readings
        .iter()
        .find(|r| r.kind() == ReadingKind::Temperature)
        .unwrap();

    assert_eq!(temperature.value(), None);
    assert!(!temperature.available());

    temperature.update().await;

    assert_eq!(temperature.value(), Some(21.5));
    assert!(temperature.available());
}

#[tokio::test]
async fn test_entry_setup_registers_readings() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "battery": { "level": 55 } })),
        None,
    )
    .await;

    let config = entry_config(&server, Duration::from_secs(300));
    let entry = VehicleEntry::setup(config, reqwest::Client::new()).await.unwrap();

    assert_eq!(entry.unique_id(), "N1ABC");
    assert_eq!(entry.title(), "Niu Vehicle N1ABC");
    let ids: Vec<&str> = entry.readings().iter().map(niuly_core::Reading::unique_id).collect();
    assert_eq!(
        ids,
        [
            "N1ABC_battery_level",
            "N1ABC_range",
            "N1ABC_speed",
            "N1ABC_mileage",
            "N1ABC_temperature"
        ]
    );
    let snapshot = entry.snapshot();
    assert_eq!(snapshot[0].value, Some(55.0));
    assert!(snapshot.iter().all(|s| s.available));

    let coordinator = entry.coordinator().clone();
    let config = entry.unload().await;
    assert_eq!(config.vehicle_id(), "N1ABC");
    assert!(coordinator.is_shut_down());
}

#[tokio::test]
async fn test_entry_setup_fails_when_first_refresh_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = entry_config(&server, Duration::from_secs(300));
    let result = VehicleEntry::setup(config, reqwest::Client::new()).await;

    assert!(matches!(result, Err(CoreError::UpdateFailed { .. })));
}

#[tokio::test]
async fn test_entry_setup_retrying_survives_failed_first_refresh() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(503), None).await;

    let config = entry_config(&server, Duration::from_secs(300));
    let entry = VehicleEntry::setup_retrying(config, reqwest::Client::new())
        .await
        .unwrap();

    assert_eq!(entry.readings().len(), 5);
    let snapshot = entry.snapshot();
    assert!(snapshot.iter().all(|s| !s.available && s.value.is_none()));
    assert!(!entry.coordinator().is_shut_down());

    let coordinator = entry.coordinator().clone();
    entry.unload().await;
    assert!(coordinator.is_shut_down());
}

// ── Setup flow ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_validate_entry_success() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(json!({})), None).await;

    let config = entry_config(&server, Duration::ZERO);
    let identity = validate_entry(&config, reqwest::Client::new()).await.unwrap();

    assert_eq!(identity.unique_id, "N1ABC");
    assert_eq!(identity.title, "Niu Vehicle N1ABC");
}

#[tokio::test]
async fn test_validate_entry_hides_error_kind() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(404), None).await;

    let config = entry_config(&server, Duration::ZERO);
    let result = validate_entry(&config, reqwest::Client::new()).await;

    assert!(matches!(result, Err(CoreError::CannotConnect)), "got {result:?}");
}

#[tokio::test]
async fn test_reauthenticate_entry_swaps_account() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(json!({})), None).await;

    let existing = entry_config(&server, Duration::from_secs(120));
    let updated = reauthenticate_entry(
        &existing,
        "new-rider",
        "new-pw".to_string().into(),
        reqwest::Client::new(),
    )
    .await
    .unwrap();

    assert_eq!(updated.credentials.username(), "new-rider");
    assert_eq!(updated.vehicle_id(), "N1ABC");
    assert_eq!(updated.scan_interval, Duration::from_secs(120));
    assert_eq!(existing.credentials.username(), "rider");

    let received = server.received_requests().await.unwrap();
    let token_body = String::from_utf8_lossy(&received[0].body).into_owned();
    assert!(token_body.contains("username=new-rider"), "body: {token_body}");
}
