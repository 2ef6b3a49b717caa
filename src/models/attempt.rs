//! Collection attempt states and outcomes.

use serde::{Deserialize, Serialize};

/// State of an outstanding collection attempt.
///
/// An idle parcel has no attempt at all; a resolved attempt is dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// A mark-collected request is in flight.
    Requested,
    /// Waiting for the asynchronous weight-sensor reading.
    AwaitingWeightCheck,
    /// Residual weight reported; waiting for the user to override or cancel.
    ConfirmPending,
}

/// How a collection request resolved from the caller's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// The parcel was marked collected.
    Collected,
    /// The box still reports weight; call `confirm_override` or `cancel`.
    ConfirmationRequired,
}
