//! Long-poll publish/subscribe transport.
//!
//! [`ChannelTransport`] performs one subscribe poll at a time; the session
//! loop in [`super::session`] drives it. [`PubNubTransport`] speaks the
//! PubNub v2 subscribe REST API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// Identity and credentials of one channel subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    /// Subscribe key of the pub/sub keyset.
    pub subscribe_key: String,
    /// Channel to subscribe to (`user-<id>`).
    pub channel: String,
    /// Identity presented to the pub/sub service.
    pub client_id: String,
    /// Authorization token.
    pub token: String,
}

/// Position in the channel's message stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Timetoken of the last batch; `"0"` requests a fresh handshake.
    pub timetoken: String,
    /// Region hint returned alongside the timetoken.
    pub region: Option<u32>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            timetoken: "0".into(),
            region: None,
        }
    }
}

/// Result of one poll: the next cursor and the messages received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Cursor to pass to the next poll.
    pub cursor: Cursor,
    /// Message payloads in publish order.
    pub messages: Vec<serde_json::Value>,
}

/// Boxed future returned by [`ChannelTransport::poll`].
pub type PollFuture<'a> = Pin<Box<dyn Future<Output = Result<Batch>> + Send + 'a>>;

/// One long-poll subscribe round trip.
pub trait ChannelTransport: Send + Sync {
    /// Wait for messages after `cursor`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when the token is rejected,
    /// `AppError::Connectivity`/`AppError::Channel`/`AppError::Protocol`
    /// for everything else.
    fn poll<'a>(&'a self, request: &'a SubscribeRequest, cursor: &'a Cursor) -> PollFuture<'a>;
}

/// Wire shape of a subscribe response.
#[derive(Debug, Deserialize)]
struct SubscribeEnvelope {
    t: TimetokenEnvelope,
    #[serde(default)]
    m: Vec<MessageEnvelope>,
}

#[derive(Debug, Deserialize)]
struct TimetokenEnvelope {
    t: String,
    #[serde(default)]
    r: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    c: Option<String>,
    d: serde_json::Value,
}

/// PubNub subscribe transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct PubNubTransport {
    http: reqwest::Client,
    origin: Url,
}

impl PubNubTransport {
    /// Build a transport from the real-time configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the origin is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.realtime.long_poll_seconds))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Self::with_client(http, &config.realtime.origin)
    }

    /// Build a transport around an existing client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `origin` is not a valid URL.
    pub fn with_client(http: reqwest::Client, origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|err| AppError::Config(format!("realtime origin invalid: {err}")))?;
        Ok(Self { http, origin })
    }

    fn subscribe_url(&self, request: &SubscribeRequest, cursor: &Cursor) -> Result<Url> {
        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|()| AppError::Config("realtime origin cannot be a base".into()))?
            .pop_if_empty()
            .extend([
                "v2",
                "subscribe",
                request.subscribe_key.as_str(),
                request.channel.as_str(),
                "0",
            ]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("uuid", &request.client_id)
                .append_pair("tt", &cursor.timetoken)
                .append_pair("auth", &request.token);
            if let Some(region) = cursor.region {
                query.append_pair("tr", &region.to_string());
            }
        }
        Ok(url)
    }
}

impl ChannelTransport for PubNubTransport {
    fn poll<'a>(&'a self, request: &'a SubscribeRequest, cursor: &'a Cursor) -> PollFuture<'a> {
        Box::pin(async move {
            let url = self.subscribe_url(request, cursor)?;
            let response = self.http.get(url).send().await?;
            let status = response.status();

            if status == StatusCode::FORBIDDEN {
                return Err(AppError::Unauthorized(format!(
                    "subscribe to {} denied",
                    request.channel
                )));
            }
            if !status.is_success() {
                return Err(AppError::Channel(format!(
                    "subscribe returned status {status}"
                )));
            }

            let body = response.bytes().await?;
            let envelope: SubscribeEnvelope = serde_json::from_slice(&body)?;
            let messages = envelope
                .m
                .into_iter()
                .filter(|message| {
                    message
                        .c
                        .as_deref()
                        .map_or(true, |channel| channel == request.channel)
                })
                .map(|message| message.d)
                .collect::<Vec<_>>();
            debug!(
                timetoken = %envelope.t.t,
                count = messages.len(),
                "subscribe poll returned"
            );

            Ok(Batch {
                cursor: Cursor {
                    timetoken: envelope.t.t,
                    region: envelope.t.r,
                },
                messages,
            })
        })
    }
}
