//! Backend response envelopes.
//!
//! Every endpoint answers with `{type, message?, error?}`; some add a
//! payload (`parcels`, `token`).

use serde::{Deserialize, Serialize};

use super::parcel::Parcel;

/// Discriminator carried in the `type` field of backend responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Operation completed.
    Success,
    /// Operation failed; `error` holds the reason.
    Error,
    /// Informational outcome (e.g. parcel already registered).
    Info,
    /// Advisory outcome.
    Warning,
    /// Collection must wait for an asynchronous weight-sensor reading.
    WeightCheck,
    /// Any discriminator this client does not know.
    #[serde(other)]
    Other,
}

/// Status envelope common to all backend endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse {
    /// Response discriminator; absent on bare payload responses.
    #[serde(rename = "type", default)]
    pub kind: Option<ResponseKind>,
    /// Human-readable success or info text.
    #[serde(default)]
    pub message: Option<String>,
    /// Human-readable failure text.
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Build a response with the given kind and message (used by fakes and tests).
    #[must_use]
    pub fn with_message(kind: ResponseKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: Some(message.into()),
            error: None,
        }
    }

    /// Build an error response carrying `error` text.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            kind: Some(ResponseKind::Error),
            message: None,
            error: Some(error.into()),
        }
    }

    /// Text to show the user: `message`, falling back to `error`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }

    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == Some(ResponseKind::Success)
    }

    /// Whether the backend reported an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == Some(ResponseKind::Error)
    }
}

/// Response of `/api/fetch-parcels`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParcelsPayload {
    /// Status envelope; only populated on failures.
    #[serde(flatten)]
    pub status: ApiResponse,
    /// Parcel entries on success.
    #[serde(default)]
    pub parcels: Option<Vec<Parcel>>,
}

/// Response of `/api/pubnub-token`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPayload {
    /// Channel authorization token, absent when the backend cannot issue one.
    #[serde(default)]
    pub token: Option<String>,
    /// Failure text, if any.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `/api/health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// `healthy` or `unhealthy`.
    #[serde(default)]
    pub status: String,
    /// Database connectivity, when healthy.
    #[serde(default)]
    pub database: Option<String>,
    /// Failure text, when unhealthy.
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthStatus {
    /// Whether the backend reports itself healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
