//! Integration tests for the parcel list controller.

use parcel_locker_client::errors::CONNECTION_ERROR_TEXT;
use parcel_locker_client::models::parcel::ParcelStatus;
use parcel_locker_client::models::response::{ApiResponse, ParcelsPayload, ResponseKind};
use parcel_locker_client::ui::board::{Controls, ListView};
use parcel_locker_client::ui::{MessageArea, Notice, NoticeLevel, UiEvent};
use parcel_locker_client::AppError;

use super::test_helpers::{parcel, Call, Harness};

#[tokio::test]
async fn empty_active_list_shows_empty_state() {
    let mut harness = Harness::new();

    harness.lists.fetch_active().await.expect("fetched");

    let board = harness.ui.board().await;
    assert_eq!(board.active, ListView::Empty);
    assert!(board.parcels_message.is_none());
    assert_eq!(
        harness.drain_events(),
        vec![UiEvent::ListUpdated(ParcelStatus::Active)]
    );
}

#[tokio::test]
async fn fetched_parcels_render_in_order() {
    let harness = Harness::new();
    harness
        .backend
        .set_active(vec![parcel("1", true), parcel("2", false)]);
    harness.backend.set_history(vec![parcel("0", true)]);

    harness.lists.refresh_all().await;

    let board = harness.ui.board().await;
    let ids: Vec<&str> = board
        .active
        .cards()
        .iter()
        .map(|card| card.parcel.id.as_str())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(board.history.cards().len(), 1);
    assert_eq!(
        harness.backend.calls(),
        vec![
            Call::Fetch(ParcelStatus::Active),
            Call::Fetch(ParcelStatus::History)
        ]
    );
}

#[tokio::test]
async fn in_band_error_shows_message_and_clears_list() {
    let harness = Harness::new();
    harness.backend.set_active(vec![parcel("1", true)]);
    harness.lists.fetch_active().await.expect("fetched");

    harness.backend.push_fetch(Ok(ParcelsPayload {
        status: ApiResponse::error("DB down"),
        parcels: None,
    }));
    let err = harness.lists.fetch_active().await.unwrap_err();

    assert_eq!(err.to_string(), "domain: DB down");
    let board = harness.ui.board().await;
    assert_eq!(board.active, ListView::Cleared);
    assert_eq!(
        board.message(MessageArea::Parcels),
        Some(&Notice::new(NoticeLevel::Error, "DB down"))
    );
}

#[tokio::test]
async fn transport_error_asks_for_refresh() {
    let harness = Harness::new();
    harness
        .backend
        .push_fetch(Err(AppError::Connectivity("connection refused".into())));

    let err = harness.lists.fetch_history().await.unwrap_err();

    assert!(matches!(err, AppError::Connectivity(_)));
    let board = harness.ui.board().await;
    assert_eq!(board.history, ListView::Cleared);
    assert_eq!(
        board.message(MessageArea::Parcels).map(|n| n.text.as_str()),
        Some("Connection error. Please refresh.")
    );
}

#[tokio::test]
async fn successful_fetch_clears_previous_error() {
    let harness = Harness::new();
    harness.backend.push_fetch(Ok(ParcelsPayload {
        status: ApiResponse::error("DB down"),
        parcels: None,
    }));
    let _ = harness.lists.fetch_active().await;

    harness.lists.fetch_active().await.expect("fetched");

    assert!(harness.ui.board().await.parcels_message.is_none());
}

#[tokio::test]
async fn unlock_switches_to_lock_and_collect() {
    let mut harness = Harness::new();
    harness.backend.set_active(vec![parcel("1", true)]);
    harness.lists.fetch_active().await.expect("fetched");
    harness.drain_events();

    harness.lists.unlock("1", "B1").await.expect("unlocked");

    assert_eq!(harness.backend.calls().last(), Some(&Call::OpenBox("1".into())));
    let board = harness.ui.board().await;
    assert_eq!(
        board.card(ParcelStatus::Active, "1").unwrap().controls,
        Controls::LockAndCollect
    );
    assert_eq!(
        harness.drain_events(),
        vec![
            UiEvent::Toast(Notice::new(NoticeLevel::Success, "Box opened successfully")),
            UiEvent::ControlsChanged {
                parcel_id: "1".into(),
                controls: Controls::LockAndCollect,
            },
        ]
    );
}

#[tokio::test]
async fn lock_switches_back_to_unlock() {
    let harness = Harness::new();
    harness.backend.set_active(vec![parcel("1", true)]);
    harness.lists.fetch_active().await.expect("fetched");
    harness.lists.unlock("1", "B1").await.expect("unlocked");

    harness.lists.lock("1", "B1").await.expect("locked");

    assert_eq!(harness.backend.calls().last(), Some(&Call::LockBox("B1".into())));
    assert_eq!(
        harness
            .ui
            .board()
            .await
            .card(ParcelStatus::Active, "1")
            .unwrap()
            .controls,
        Controls::Unlock
    );
}

#[tokio::test]
async fn unlocked_state_survives_list_refresh() {
    let harness = Harness::new();
    harness.backend.set_active(vec![parcel("1", true)]);
    harness.lists.fetch_active().await.expect("fetched");
    harness.lists.unlock("1", "B1").await.expect("unlocked");

    harness.lists.fetch_active().await.expect("refetched");

    assert_eq!(
        harness
            .ui
            .board()
            .await
            .card(ParcelStatus::Active, "1")
            .unwrap()
            .controls,
        Controls::LockAndCollect
    );
}

#[tokio::test]
async fn rejected_unlock_leaves_controls_unchanged() {
    let mut harness = Harness::new();
    harness.backend.set_active(vec![parcel("1", true)]);
    harness.lists.fetch_active().await.expect("fetched");
    harness.drain_events();
    harness
        .backend
        .push_command(Ok(ApiResponse::error("Box is offline")));

    let err = harness.lists.unlock("1", "B1").await.unwrap_err();

    assert_eq!(err.to_string(), "domain: Box is offline");
    assert_eq!(
        harness
            .ui
            .board()
            .await
            .card(ParcelStatus::Active, "1")
            .unwrap()
            .controls,
        Controls::Unlock
    );
    assert_eq!(
        harness.drain_events(),
        vec![UiEvent::Toast(Notice::new(NoticeLevel::Error, "Box is offline"))]
    );
}

#[tokio::test]
async fn unlock_transport_failure_shows_connection_error() {
    let mut harness = Harness::new();
    harness
        .backend
        .push_command(Err(AppError::Connectivity("timed out".into())));

    let err = harness.lists.unlock("1", "B1").await.unwrap_err();

    assert!(matches!(err, AppError::Connectivity(_)));
    assert_eq!(
        harness.drain_events(),
        vec![UiEvent::Toast(Notice::new(
            NoticeLevel::Error,
            CONNECTION_ERROR_TEXT
        ))]
    );
}

#[tokio::test]
async fn register_success_clears_input_and_refreshes_active() {
    let mut harness = Harness::new();
    harness
        .ui
        .with_board(|board| board.register_input = "PKG-9".into())
        .await;

    harness.lists.register("PKG-9").await.expect("registered");

    let board = harness.ui.board().await;
    assert!(board.register_input.is_empty());
    assert_eq!(
        board.message(MessageArea::Register),
        Some(&Notice::new(
            NoticeLevel::Success,
            "Parcel registered successfully"
        ))
    );
    assert_eq!(
        harness.backend.calls(),
        vec![
            Call::Register("PKG-9".into()),
            Call::Fetch(ParcelStatus::Active)
        ]
    );
    assert!(harness
        .drain_events()
        .contains(&UiEvent::RegisterInputCleared));
}

#[tokio::test]
async fn register_info_reply_also_clears_input() {
    let harness = Harness::new();
    harness.ui.with_board(|board| board.register_input = "PKG-9".into()).await;
    harness.backend.push_command(Ok(ApiResponse::with_message(
        ResponseKind::Info,
        "Parcel already registered to you",
    )));

    harness.lists.register("PKG-9").await.expect("info accepted");

    let board = harness.ui.board().await;
    assert!(board.register_input.is_empty());
    assert_eq!(
        board.message(MessageArea::Register).map(|n| n.level),
        Some(NoticeLevel::Info)
    );
    assert_eq!(harness.backend.fetches(ParcelStatus::Active), 1);
}

#[tokio::test]
async fn register_error_keeps_input() {
    let harness = Harness::new();
    harness.ui.with_board(|board| board.register_input = "PKG-9".into()).await;
    harness
        .backend
        .push_command(Ok(ApiResponse::error("Parcel not found")));

    let err = harness.lists.register("PKG-9").await.unwrap_err();

    assert_eq!(err.to_string(), "domain: Parcel not found");
    let board = harness.ui.board().await;
    assert_eq!(board.register_input, "PKG-9");
    assert_eq!(
        board.message(MessageArea::Register),
        Some(&Notice::new(NoticeLevel::Error, "Parcel not found"))
    );
    assert_eq!(harness.backend.fetches(ParcelStatus::Active), 0);
}

#[tokio::test]
async fn register_transport_failure_shows_connection_error() {
    let harness = Harness::new();
    harness
        .backend
        .push_command(Err(AppError::Connectivity("refused".into())));

    harness.lists.register("PKG-9").await.unwrap_err();

    assert_eq!(
        harness
            .ui
            .board()
            .await
            .message(MessageArea::Register)
            .map(|n| n.text.clone()),
        Some(CONNECTION_ERROR_TEXT.to_owned())
    );
}
