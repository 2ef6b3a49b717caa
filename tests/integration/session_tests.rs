//! Integration tests for the subscription loop over a scripted transport.

use serde_json::json;
use tokio::sync::mpsc;

use parcel_locker_client::realtime::session::{ChannelEvent, ChannelSession, ChannelStatus};
use parcel_locker_client::realtime::transport::SubscribeRequest;

use super::test_helpers::MockTransport;

fn request(token: &str) -> SubscribeRequest {
    SubscribeRequest {
        subscribe_key: "sub-c-test".into(),
        channel: "user-42".into(),
        client_id: "user-web-42".into(),
        token: token.into(),
    }
}

#[tokio::test]
async fn connected_is_reported_once() {
    let transport = MockTransport::new();
    let (tx, mut rx) = mpsc::channel(16);
    let session = ChannelSession::open(transport.clone(), request("tok"), tx);

    transport.push(json!({"n": 1}));
    transport.push(json!({"n": 2}));

    assert_eq!(
        rx.recv().await,
        Some(ChannelEvent::Status(ChannelStatus::Connected))
    );
    assert_eq!(rx.recv().await, Some(ChannelEvent::Message(json!({"n": 1}))));
    assert_eq!(rx.recv().await, Some(ChannelEvent::Message(json!({"n": 2}))));

    session.close().await;
}

#[tokio::test]
async fn close_stops_polling() {
    let transport = MockTransport::new();
    let (tx, mut rx) = mpsc::channel(16);
    let session = ChannelSession::open(transport.clone(), request("tok"), tx);
    assert_eq!(session.request().token, "tok");

    session.close().await;

    assert_eq!(rx.recv().await, None);
    assert!(transport.polls().len() <= 1);
}

#[tokio::test]
async fn denied_token_ends_subscription() {
    let transport = MockTransport::new();
    transport.deny("stale");
    let (tx, mut rx) = mpsc::channel(16);
    let session = ChannelSession::open(transport.clone(), request("stale"), tx);

    assert_eq!(
        rx.recv().await,
        Some(ChannelEvent::Status(ChannelStatus::AccessDenied))
    );
    assert_eq!(rx.recv().await, None);
    assert_eq!(transport.polls(), vec!["stale".to_owned()]);

    session.close().await;
}

#[tokio::test]
async fn dropping_session_cancels_loop() {
    let transport = MockTransport::new();
    let (tx, mut rx) = mpsc::channel(16);
    let session = ChannelSession::open(transport.clone(), request("tok"), tx);

    drop(session);

    assert_eq!(rx.recv().await, None);
}
