//! Unit tests for board state rendering rules.

use serde_json::json;

use parcel_locker_client::models::parcel::{Parcel, ParcelState, ParcelStatus};
use parcel_locker_client::models::response::{ApiResponse, ResponseKind};
use parcel_locker_client::ui::board::{BoardState, Controls, ListView};
use parcel_locker_client::ui::{MessageArea, Notice, NoticeLevel};

fn parcel(id: &str, delivered: bool) -> Parcel {
    serde_json::from_value(json!({
        "id": id,
        "parcel_name": format!("Parcel {id}"),
        "box_id": "B1",
        "box_name": "Box 1",
        "is_delivered": delivered
    }))
    .expect("parcel decodes")
}

#[test]
fn new_board_is_cleared() {
    let board = BoardState::default();
    assert_eq!(board.active, ListView::Cleared);
    assert_eq!(board.history, ListView::Cleared);
    assert!(board.confirm_prompts.is_empty());
}

#[test]
fn empty_fetch_shows_empty_state() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::Active, Vec::new());
    assert_eq!(board.active, ListView::Empty);
    assert!(board.active.cards().is_empty());
}

#[test]
fn delivered_parcels_offer_unlock() {
    let mut board = BoardState::default();
    board.set_list(
        ParcelStatus::Active,
        vec![parcel("1", true), parcel("2", false)],
    );

    let ready = board.card(ParcelStatus::Active, "1").unwrap();
    assert_eq!(ready.state, ParcelState::ReadyForUnlock);
    assert_eq!(ready.controls, Controls::Unlock);

    let transit = board.card(ParcelStatus::Active, "2").unwrap();
    assert_eq!(transit.state, ParcelState::InTransit);
    assert_eq!(transit.controls, Controls::None);
}

#[test]
fn history_cards_have_no_controls() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::History, vec![parcel("1", true)]);

    let card = board.card(ParcelStatus::History, "1").unwrap();
    assert_eq!(card.state, ParcelState::Collected);
    assert_eq!(card.controls, Controls::None);
}

#[test]
fn unlocked_controls_survive_refresh() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    assert!(board.set_controls("1", Controls::LockAndCollect));

    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    assert_eq!(
        board.card(ParcelStatus::Active, "1").unwrap().controls,
        Controls::LockAndCollect
    );
}

#[test]
fn controls_forgotten_once_parcel_leaves_active_list() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    board.set_controls("1", Controls::LockAndCollect);

    board.set_list(ParcelStatus::Active, Vec::new());
    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    assert_eq!(
        board.card(ParcelStatus::Active, "1").unwrap().controls,
        Controls::Unlock
    );
}

#[test]
fn history_refresh_keeps_active_overrides() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    board.set_controls("1", Controls::LockAndCollect);

    board.set_list(ParcelStatus::History, Vec::new());
    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    assert_eq!(
        board.card(ParcelStatus::Active, "1").unwrap().controls,
        Controls::LockAndCollect
    );
}

#[test]
fn set_controls_on_unrendered_parcel_reports_false() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::Active, vec![parcel("2", false)]);
    assert!(!board.set_controls("2", Controls::LockAndCollect));
    assert!(!board.set_controls("9", Controls::LockAndCollect));
}

#[test]
fn clear_list_resets_view() {
    let mut board = BoardState::default();
    board.set_list(ParcelStatus::Active, vec![parcel("1", true)]);
    board.clear_list(ParcelStatus::Active);
    assert_eq!(board.active, ListView::Cleared);
}

#[test]
fn message_areas_are_independent() {
    let mut board = BoardState::default();
    *board.message_mut(MessageArea::Register) = Some(Notice::new(NoticeLevel::Success, "ok"));

    assert_eq!(board.message(MessageArea::Register).unwrap().text, "ok");
    assert!(board.message(MessageArea::Parcels).is_none());
}

#[test]
fn notice_levels_follow_response_kind() {
    let cases = [
        (Some(ResponseKind::Success), NoticeLevel::Success),
        (Some(ResponseKind::Error), NoticeLevel::Error),
        (Some(ResponseKind::Info), NoticeLevel::Info),
        (Some(ResponseKind::WeightCheck), NoticeLevel::Info),
        (Some(ResponseKind::Warning), NoticeLevel::Warning),
        (None, NoticeLevel::Error),
    ];
    for (kind, expected) in cases {
        let response = ApiResponse {
            kind,
            ..ApiResponse::default()
        };
        assert_eq!(NoticeLevel::for_response(&response), expected);
    }
}

#[test]
fn notice_without_text_falls_back_to_generic_error() {
    let notice = Notice::from_response(&ApiResponse::default());
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.text, "An error occurred");
}
