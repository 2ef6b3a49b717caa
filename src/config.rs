//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Keychain service name holding the client's credentials.
const KEYRING_SERVICE: &str = "parcel-locker";

/// How the client identifies itself on the notification channel.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientIdStyle {
    /// `user-web-<user_id>`, used by the browser dashboard.
    #[default]
    Web,
    /// `user-<user_id>`, identical to the channel name.
    Plain,
}

/// Real-time notification channel settings.
///
/// The subscribe key may be set here or supplied at runtime; the
/// channel token is only ever loaded at runtime.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RealtimeConfig {
    /// Base URL of the publish/subscribe origin.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Subscribe key; absent or placeholder disables real-time updates.
    #[serde(default)]
    pub subscribe_key: Option<String>,
    /// Initial channel authorization token (populated at runtime).
    #[serde(skip)]
    pub token: Option<String>,
    /// Client identity format on the channel.
    #[serde(default)]
    pub client_id_style: ClientIdStyle,
    /// Server-side long-poll window.
    #[serde(default = "default_long_poll_seconds")]
    pub long_poll_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            subscribe_key: None,
            token: None,
            client_id_style: ClientIdStyle::default(),
            long_poll_seconds: default_long_poll_seconds(),
        }
    }
}

/// Configurable timeout values for backend calls and the collection flow.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Per-request timeout for backend HTTP calls.
    #[serde(default = "default_request_seconds")]
    pub request_seconds: u64,
    /// Maximum wait for an asynchronous weight-check reading.
    #[serde(default = "default_weight_check_seconds")]
    pub weight_check_seconds: u64,
    /// Delay between a forced collection succeeding and the list refresh.
    #[serde(default = "default_removal_delay_ms")]
    pub removal_delay_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_seconds: default_request_seconds(),
            weight_check_seconds: default_weight_check_seconds(),
            removal_delay_ms: default_removal_delay_ms(),
        }
    }
}

fn default_origin() -> String {
    "https://ps.pndsn.com".into()
}

fn default_long_poll_seconds() -> u64 {
    310
}

fn default_request_seconds() -> u64 {
    15
}

fn default_weight_check_seconds() -> u64 {
    60
}

fn default_removal_delay_ms() -> u64 {
    500
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Base URL of the locker backend (e.g. `https://locker.example.com`).
    pub backend_url: String,
    /// Identifier of the signed-in user; selects the notification channel.
    pub user_id: String,
    /// Dashboard session token sent as the `token` cookie (populated at runtime).
    #[serde(skip)]
    pub session_token: Option<String>,
    /// Real-time notification settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Timeout configuration.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load runtime credentials from the OS keychain with env-var fallback.
    ///
    /// Every credential is optional. A missing session token means requests
    /// go out without a cookie; a missing subscribe key or channel token
    /// disables real-time notifications.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain lookup task panics.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.session_token =
            load_credential("session_token", "PARCEL_LOCKER_SESSION_TOKEN").await?;
        if let Some(key) = load_credential("subscribe_key", "PUBNUB_SUBSCRIBE_KEY").await? {
            self.realtime.subscribe_key = Some(key);
        }
        self.realtime.token = load_credential("channel_token", "PUBNUB_TOKEN").await?;
        Ok(())
    }

    /// Per-user notification channel name.
    #[must_use]
    pub fn channel_name(&self) -> String {
        channel_name(&self.user_id)
    }

    /// Identity this client presents on the notification channel.
    #[must_use]
    pub fn client_id(&self) -> String {
        client_id(&self.user_id, self.realtime.client_id_style)
    }

    /// Per-request timeout for backend calls.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_seconds)
    }

    /// Bounded wait for the asynchronous weight-check reading.
    #[must_use]
    pub fn weight_check_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.weight_check_seconds)
    }

    /// Deferral before lists are refreshed after a confirmed override.
    #[must_use]
    pub fn removal_delay(&self) -> Duration {
        Duration::from_millis(self.timeouts.removal_delay_ms)
    }

    fn validate(&mut self) -> Result<()> {
        let url = reqwest::Url::parse(&self.backend_url)
            .map_err(|err| AppError::Config(format!("backend_url invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "backend_url must use http or https".into(),
            ));
        }
        self.backend_url = self.backend_url.trim_end_matches('/').to_owned();

        if self.user_id.trim().is_empty() {
            return Err(AppError::Config("user_id must not be empty".into()));
        }

        if self.timeouts.weight_check_seconds == 0 {
            return Err(AppError::Config(
                "weight_check_seconds must be greater than zero".into(),
            ));
        }

        if self.timeouts.request_seconds == 0 {
            return Err(AppError::Config(
                "request_seconds must be greater than zero".into(),
            ));
        }

        if self
            .realtime
            .subscribe_key
            .as_deref()
            .is_some_and(is_placeholder)
        {
            self.realtime.subscribe_key = None;
        }

        Ok(())
    }
}

/// Channel name for a given user.
#[must_use]
pub fn channel_name(user_id: &str) -> String {
    format!("user-{user_id}")
}

/// Client identity presented on the notification channel.
#[must_use]
pub fn client_id(user_id: &str, style: ClientIdStyle) -> String {
    match style {
        ClientIdStyle::Web => format!("user-web-{user_id}"),
        ClientIdStyle::Plain => channel_name(user_id),
    }
}

/// Whether a credential value is absent in all but name.
///
/// Templated pages render missing values as `None`, `null` or
/// `undefined`; all of those mean "not configured".
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || ["none", "null", "undefined"]
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// Load a single optional credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !is_placeholder(&value) => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(keyring::Error::NoEntry) => {
            debug!(key = keyring_key, "no keychain entry, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    Ok(env::var(env_key).ok().filter(|value| !is_placeholder(value)))
}
