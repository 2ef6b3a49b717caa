//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Wording shown to the user for any transport-level failure.
pub const CONNECTION_ERROR_TEXT: &str = "Connection error. Please try again.";

/// Wording shown to the user when the weight sensor never reports back.
pub const WEIGHT_CHECK_TIMEOUT_TEXT: &str = "Weight check timed out. Please try again.";

/// Client error enumeration covering all failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Network or transport failure talking to the backend.
    Connectivity(String),
    /// Business-rule failure reported by the backend (e.g. box already locked).
    Domain(String),
    /// Real-time channel token was rejected.
    Unauthorized(String),
    /// Response body could not be decoded.
    Protocol(String),
    /// Real-time transport failure other than authorization.
    Channel(String),
    /// A bounded wait elapsed without a result.
    Timeout(String),
    /// A collection attempt for this parcel is already outstanding.
    AlreadyPending(String),
    /// No attempt exists in the state the operation requires.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Text suitable for a transient user-facing notification.
    ///
    /// Transport-level failures are worded generically; backend-reported
    /// failures carry the server text verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Connectivity(_) | Self::Protocol(_) | Self::Channel(_) => {
                CONNECTION_ERROR_TEXT.to_owned()
            }
            Self::Timeout(_) => WEIGHT_CHECK_TIMEOUT_TEXT.to_owned(),
            Self::Domain(msg)
            | Self::AlreadyPending(msg)
            | Self::NotFound(msg)
            | Self::Config(msg)
            | Self::Unauthorized(msg)
            | Self::Io(msg) => msg.clone(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Connectivity(msg) => write!(f, "connectivity: {msg}"),
            Self::Domain(msg) => write!(f, "domain: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Channel(msg) => write!(f, "channel: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::AlreadyPending(msg) => write!(f, "already pending: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
