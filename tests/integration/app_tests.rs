//! End-to-end tests of the wired client over mock backend and transport.

use std::sync::Arc;

use serde_json::json;

use parcel_locker_client::app::{delivery_text, LockerApp};
use parcel_locker_client::models::attempt::{AttemptState, CollectionOutcome};
use parcel_locker_client::models::parcel::ParcelStatus;
use parcel_locker_client::realtime::client::ConnectOutcome;
use parcel_locker_client::realtime::dispatch::DeliveryProjection;
use parcel_locker_client::ui::{MessageArea, Notice, NoticeLevel};
use parcel_locker_client::GlobalConfig;

use super::test_helpers::{
    parcel, test_config, wait_until, weight_check_reply, MockBackend, MockTransport,
};

fn build(config: GlobalConfig) -> (LockerApp, Arc<MockBackend>, Arc<MockTransport>) {
    let backend = MockBackend::new();
    let transport = MockTransport::new();
    let (app, _events) = LockerApp::new(
        config,
        backend.clone(),
        transport.clone(),
        DeliveryProjection::Minimal,
    );
    (app, backend, transport)
}

fn config_with_token(token: &str) -> GlobalConfig {
    let mut config = test_config();
    config.realtime.token = Some(token.to_owned());
    config
}

#[test]
fn delivery_text_names_parcel_and_box() {
    assert_eq!(
        delivery_text("Book", "Box A"),
        "\u{1f4e6} Your parcel \"Book\" has been delivered to Box A!"
    );
}

#[tokio::test]
async fn start_renders_lists_then_subscribes() {
    let (app, backend, transport) = build(config_with_token("tok"));
    backend.set_active(vec![parcel("1", true)]);

    let outcome = app.start().await;

    assert_eq!(outcome, ConnectOutcome::Connected);
    assert_eq!(backend.fetches(ParcelStatus::Active), 1);
    assert_eq!(backend.fetches(ParcelStatus::History), 1);
    assert_eq!(backend.token_calls(), 0);
    assert_eq!(app.ui().board().await.active.cards().len(), 1);

    let transport = Arc::clone(&transport);
    wait_until(|| {
        let transport = Arc::clone(&transport);
        async move { transport.polls() == vec!["tok".to_owned()] }
    })
    .await;

    app.shutdown().await;
    assert!(!app.notifications().is_connected().await);
}

#[tokio::test]
async fn start_requests_token_when_none_configured() {
    let (app, backend, _transport) = build(test_config());
    backend.push_token(Ok(Some("issued".into())));

    assert_eq!(app.start().await, ConnectOutcome::Connected);
    assert_eq!(backend.token_calls(), 1);
    assert_eq!(
        app.notifications().current_token().await.as_deref(),
        Some("issued")
    );

    app.shutdown().await;
}

#[tokio::test]
async fn start_without_issued_token_disables_notifications() {
    let (app, backend, transport) = build(test_config());

    assert_eq!(app.start().await, ConnectOutcome::Disabled);
    assert_eq!(backend.token_calls(), 1);
    assert_eq!(backend.fetches(ParcelStatus::Active), 1);
    assert!(transport.polls().is_empty());
}

#[tokio::test]
async fn start_without_subscribe_key_skips_token_request() {
    let mut config = test_config();
    config.realtime.subscribe_key = None;
    let (app, backend, _transport) = build(config);

    assert_eq!(app.start().await, ConnectOutcome::Disabled);
    assert_eq!(backend.token_calls(), 0);
}

#[tokio::test]
async fn delivery_notification_shows_message_and_refreshes_active() {
    let (app, backend, transport) = build(config_with_token("tok"));
    app.start().await;
    backend.set_active(vec![parcel("1", true)]);

    transport.push(json!({
        "type": "parcel_delivered",
        "parcel_name": "Book",
        "box_name": "Box A"
    }));

    let ui = app.ui().clone();
    wait_until(|| {
        let ui = ui.clone();
        async move { ui.board().await.parcels_message.is_some() }
    })
    .await;
    let backend_ref = Arc::clone(&backend);
    wait_until(|| {
        let backend = Arc::clone(&backend_ref);
        async move { backend.fetches(ParcelStatus::Active) == 2 }
    })
    .await;

    let board = app.ui().board().await;
    assert_eq!(
        board.message(MessageArea::Parcels),
        Some(&Notice::new(NoticeLevel::Success, delivery_text("Book", "Box A")))
    );

    app.shutdown().await;
}

#[tokio::test]
async fn weight_reading_over_channel_completes_collection() {
    let (app, backend, transport) = build(config_with_token("tok"));
    app.start().await;
    backend.push_collect(Ok(weight_check_reply()));

    let collection = Arc::clone(app.collection());
    let handle = tokio::spawn(async move { collection.collect("77").await });
    let collection = Arc::clone(app.collection());
    wait_until(|| {
        let collection = Arc::clone(&collection);
        async move { collection.state("77") == Some(AttemptState::AwaitingWeightCheck) }
    })
    .await;

    transport.push(json!({"type": "weight_check_response", "parcel_id": 77, "has_weight": false}));

    let outcome = handle.await.unwrap().expect("collected");
    assert_eq!(outcome, CollectionOutcome::Collected);
    assert_eq!(backend.collect_calls(), vec![false, true]);

    app.shutdown().await;
}
