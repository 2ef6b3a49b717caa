//! Inbound real-time notification shapes.

use serde::{Deserialize, Serialize};

use super::deserialize_id;

/// Message pushed on the per-user notification channel.
///
/// Unknown `type` values decode to [`InboundMessage::Unknown`] so newer
/// publishers never break older clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// A parcel was placed in its box.
    ParcelDelivered(ParcelDelivered),
    /// The load cell answered a weight-check request.
    WeightCheckResponse(WeightCheckResponse),
    /// Any other message type.
    #[serde(other)]
    Unknown,
}

/// Payload of a `parcel_delivered` notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParcelDelivered {
    /// Display name of the delivered parcel.
    pub parcel_name: String,
    /// Display name of the box it was delivered to.
    pub box_name: String,
}

/// Payload of a `weight_check_response` notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeightCheckResponse {
    /// Parcel the reading was requested for.
    #[serde(deserialize_with = "deserialize_id")]
    pub parcel_id: String,
    /// Whether the box still holds weight above the empty threshold.
    pub has_weight: bool,
}
