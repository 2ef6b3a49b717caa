//! `reqwest`-based implementation of the locker backend API.

use reqwest::header::COOKIE;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{Backend, BackendFuture};
use crate::config::GlobalConfig;
use crate::models::parcel::ParcelStatus;
use crate::models::response::{ApiResponse, HealthStatus, ParcelsPayload, TokenPayload};
use crate::{AppError, Result};

/// Body of `/api/register-parcel` and `/api/open-box`.
#[derive(Debug, Serialize)]
struct ParcelRequest<'a> {
    parcel_id: &'a str,
}

/// Body of `/api/lock-box`.
#[derive(Debug, Serialize)]
struct BoxRequest<'a> {
    box_id: &'a str,
}

/// Body of `/api/mark-collected`; `force` is only sent when set.
#[derive(Debug, Serialize)]
struct MarkCollectedRequest<'a> {
    parcel_id: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    force: bool,
}

/// HTTP client for the locker backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
    session_token: Option<String>,
}

impl HttpBackend {
    /// Build a client from the global configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the base URL is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Self::with_client(http, &config.backend_url, config.session_token.clone())
    }

    /// Build a backend around an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `base_url` is not a valid URL.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        session_token: Option<String>,
    ) -> Result<Self> {
        // Trailing slash so relative joins keep any path prefix.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|err| AppError::Config(format!("backend_url invalid: {err}")))?;
        Ok(Self {
            http,
            base_url,
            session_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| AppError::Config(format!("invalid endpoint {path}: {err}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session_token {
            Some(ref token) => request.header(COOKIE, format!("token={token}")),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.authorize(self.http.get(url)).send().await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self
            .authorize(self.http.post(url).json(body))
            .send()
            .await?;
        decode(response).await
    }
}

/// Decode a JSON body regardless of HTTP status.
///
/// The backend reports failures in-band (`{type: "error"}`) alongside
/// 4xx/5xx codes, so the status alone is not an error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| {
        AppError::Protocol(format!("undecodable response (status {status}): {err}"))
    })
}

impl Backend for HttpBackend {
    fn fetch_parcels(&self, status: ParcelStatus) -> BackendFuture<'_, ParcelsPayload> {
        Box::pin(async move {
            let mut url = self.endpoint("api/fetch-parcels")?;
            url.query_pairs_mut()
                .append_pair("status", status.as_query());
            self.get_json(url).await
        })
    }

    fn register_parcel<'a>(&'a self, parcel_id: &'a str) -> BackendFuture<'a, ApiResponse> {
        Box::pin(async move {
            self.post_json("api/register-parcel", &ParcelRequest { parcel_id })
                .await
        })
    }

    fn open_box<'a>(&'a self, parcel_id: &'a str) -> BackendFuture<'a, ApiResponse> {
        Box::pin(async move {
            self.post_json("api/open-box", &ParcelRequest { parcel_id })
                .await
        })
    }

    fn lock_box<'a>(&'a self, box_id: &'a str) -> BackendFuture<'a, ApiResponse> {
        Box::pin(async move { self.post_json("api/lock-box", &BoxRequest { box_id }).await })
    }

    fn mark_collected<'a>(
        &'a self,
        parcel_id: &'a str,
        force: bool,
    ) -> BackendFuture<'a, ApiResponse> {
        Box::pin(async move {
            self.post_json(
                "api/mark-collected",
                &MarkCollectedRequest { parcel_id, force },
            )
            .await
        })
    }

    fn channel_token(&self) -> BackendFuture<'_, Option<String>> {
        Box::pin(async move {
            let url = self.endpoint("api/pubnub-token")?;
            let payload: TokenPayload = self.get_json(url).await?;
            if let Some(ref error) = payload.error {
                debug!(%error, "token endpoint reported an error");
            }
            Ok(payload.token.filter(|token| !token.is_empty()))
        })
    }

    fn health(&self) -> BackendFuture<'_, HealthStatus> {
        Box::pin(async move {
            let url = self.endpoint("api/health")?;
            self.get_json(url).await
        })
    }
}
