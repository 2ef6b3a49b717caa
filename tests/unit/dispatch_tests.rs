//! Unit tests for inbound message classification and routing.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;

use parcel_locker_client::models::notification::WeightCheckResponse;
use parcel_locker_client::realtime::dispatch::{
    DeliveryNotice, DeliveryProjection, Dispatched, ListenerFuture, MessageDispatcher,
    NotificationListener,
};

#[derive(Default)]
struct RecordingListener {
    deliveries: Mutex<Vec<DeliveryNotice>>,
    weight_checks: Mutex<Vec<WeightCheckResponse>>,
}

impl NotificationListener for RecordingListener {
    fn on_parcel_delivered<'a>(&'a self, notice: &'a DeliveryNotice) -> ListenerFuture<'a> {
        Box::pin(async move {
            self.deliveries.lock().await.push(notice.clone());
        })
    }

    fn on_weight_check<'a>(&'a self, response: &'a WeightCheckResponse) -> ListenerFuture<'a> {
        Box::pin(async move {
            self.weight_checks.lock().await.push(response.clone());
        })
    }
}

fn dispatcher(projection: DeliveryProjection) -> (MessageDispatcher, Arc<RecordingListener>) {
    let listener = Arc::new(RecordingListener::default());
    let dispatcher = MessageDispatcher::new(listener.clone(), projection);
    (dispatcher, listener)
}

#[tokio::test]
async fn delivery_gets_minimal_projection_by_default() {
    let (dispatcher, listener) = dispatcher(DeliveryProjection::default());
    let raw = json!({
        "type": "parcel_delivered",
        "parcel_name": "Book",
        "box_name": "Box A",
        "parcel_id": 3
    });

    assert_eq!(dispatcher.dispatch(&raw).await, Dispatched::Delivery);

    let deliveries = listener.deliveries.lock().await;
    assert_eq!(
        *deliveries,
        vec![DeliveryNotice {
            parcel_name: "Book".into(),
            box_name: "Box A".into(),
            message: None,
        }]
    );
    assert!(listener.weight_checks.lock().await.is_empty());
}

#[tokio::test]
async fn full_projection_carries_raw_message() {
    let (dispatcher, listener) = dispatcher(DeliveryProjection::Full);
    let raw = json!({
        "type": "parcel_delivered",
        "parcel_name": "Book",
        "box_name": "Box A"
    });

    dispatcher.dispatch(&raw).await;

    let deliveries = listener.deliveries.lock().await;
    assert_eq!(deliveries[0].message.as_ref(), Some(&raw));
}

#[tokio::test]
async fn weight_check_routes_to_weight_handler() {
    let (dispatcher, listener) = dispatcher(DeliveryProjection::Minimal);
    let raw = json!({"type": "weight_check_response", "parcel_id": "P1", "has_weight": true});

    assert_eq!(dispatcher.dispatch(&raw).await, Dispatched::WeightCheck);

    let checks = listener.weight_checks.lock().await;
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].parcel_id, "P1");
    assert!(checks[0].has_weight);
    assert!(listener.deliveries.lock().await.is_empty());
}

#[tokio::test]
async fn unknown_type_invokes_no_handler() {
    let (dispatcher, listener) = dispatcher(DeliveryProjection::Minimal);
    let raw = json!({"type": "box_status", "box_id": 1});

    assert_eq!(dispatcher.dispatch(&raw).await, Dispatched::Ignored);
    assert!(listener.deliveries.lock().await.is_empty());
    assert!(listener.weight_checks.lock().await.is_empty());
}

#[tokio::test]
async fn malformed_payloads_are_ignored() {
    let (dispatcher, listener) = dispatcher(DeliveryProjection::Minimal);

    for raw in [
        json!("just a string"),
        json!({"parcel_name": "no type"}),
        json!({"type": "weight_check_response", "parcel_id": "P1"}),
        json!({"type": "parcel_delivered", "parcel_name": "Book"}),
    ] {
        assert_eq!(dispatcher.dispatch(&raw).await, Dispatched::Ignored);
    }
    assert!(listener.deliveries.lock().await.is_empty());
    assert!(listener.weight_checks.lock().await.is_empty());
}
