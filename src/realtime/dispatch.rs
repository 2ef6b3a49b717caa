//! Inbound message classification and routing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::notification::{InboundMessage, ParcelDelivered, WeightCheckResponse};

/// Boxed future returned by [`NotificationListener`] methods.
pub type ListenerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// What the delivery callback receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryProjection {
    /// Only `{parcel_name, box_name}`.
    #[default]
    Minimal,
    /// The projection plus the full raw message.
    Full,
}

/// Delivery notice handed to [`NotificationListener::on_parcel_delivered`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryNotice {
    /// Display name of the delivered parcel.
    pub parcel_name: String,
    /// Display name of the box.
    pub box_name: String,
    /// Full message, present under [`DeliveryProjection::Full`].
    pub message: Option<serde_json::Value>,
}

/// Receiver of classified notifications, one method per message variant.
pub trait NotificationListener: Send + Sync {
    /// A parcel was delivered to its box.
    fn on_parcel_delivered<'a>(&'a self, notice: &'a DeliveryNotice) -> ListenerFuture<'a>;

    /// The load cell reported a weight-check result.
    fn on_weight_check<'a>(&'a self, response: &'a WeightCheckResponse) -> ListenerFuture<'a>;
}

/// How a message was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Routed to `on_parcel_delivered`.
    Delivery,
    /// Routed to `on_weight_check`.
    WeightCheck,
    /// Unknown type or malformed payload; dropped.
    Ignored,
}

/// Routes raw channel messages to a [`NotificationListener`].
pub struct MessageDispatcher {
    listener: Arc<dyn NotificationListener>,
    projection: DeliveryProjection,
}

impl MessageDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(listener: Arc<dyn NotificationListener>, projection: DeliveryProjection) -> Self {
        Self {
            listener,
            projection,
        }
    }

    /// Classify `raw` and invoke the matching listener method.
    ///
    /// Never fails: unknown and malformed messages are logged and dropped.
    pub async fn dispatch(&self, raw: &serde_json::Value) -> Dispatched {
        let message: InboundMessage = match serde_json::from_value(raw.clone()) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "malformed notification ignored");
                return Dispatched::Ignored;
            }
        };

        match message {
            InboundMessage::ParcelDelivered(ParcelDelivered {
                parcel_name,
                box_name,
            }) => {
                info!(parcel_name, box_name, "parcel delivered notification");
                let notice = DeliveryNotice {
                    parcel_name,
                    box_name,
                    message: match self.projection {
                        DeliveryProjection::Minimal => None,
                        DeliveryProjection::Full => Some(raw.clone()),
                    },
                };
                self.listener.on_parcel_delivered(&notice).await;
                Dispatched::Delivery
            }
            InboundMessage::WeightCheckResponse(response) => {
                info!(
                    parcel_id = %response.parcel_id,
                    has_weight = response.has_weight,
                    "weight check notification"
                );
                self.listener.on_weight_check(&response).await;
                Dispatched::WeightCheck
            }
            InboundMessage::Unknown => {
                debug!(message_type = ?raw.get("type"), "unknown notification type ignored");
                Dispatched::Ignored
            }
        }
    }
}
