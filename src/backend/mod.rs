//! Locker backend API abstraction.
//!
//! The [`Backend`] trait decouples the workflows from the HTTP transport so
//! the controller, collection workflow and notification client can be
//! driven by an in-memory fake in tests.

pub mod client;

use std::future::Future;
use std::pin::Pin;

use crate::models::parcel::ParcelStatus;
use crate::models::response::{ApiResponse, HealthStatus, ParcelsPayload};
use crate::Result;

/// Boxed future returned by [`Backend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Contract of the locker backend's JSON API.
///
/// Implementations return `Ok` whenever the backend answered with a
/// decodable body, including in-band `{type: "error"}` replies. `Err` is
/// reserved for transport and decoding failures.
pub trait Backend: Send + Sync {
    /// `GET /api/fetch-parcels?status=active|history`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn fetch_parcels(&self, status: ParcelStatus) -> BackendFuture<'_, ParcelsPayload>;

    /// `POST /api/register-parcel` with `{parcel_id}`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn register_parcel<'a>(&'a self, parcel_id: &'a str) -> BackendFuture<'a, ApiResponse>;

    /// `POST /api/open-box` with `{parcel_id}`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn open_box<'a>(&'a self, parcel_id: &'a str) -> BackendFuture<'a, ApiResponse>;

    /// `POST /api/lock-box` with `{box_id}`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn lock_box<'a>(&'a self, box_id: &'a str) -> BackendFuture<'a, ApiResponse>;

    /// `POST /api/mark-collected` with `{parcel_id, force}`.
    ///
    /// With `force` set the backend skips the weight gate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn mark_collected<'a>(&'a self, parcel_id: &'a str, force: bool)
        -> BackendFuture<'a, ApiResponse>;

    /// `GET /api/pubnub-token`; `Ok(None)` when the reply carries no token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn channel_token(&self) -> BackendFuture<'_, Option<String>>;

    /// `GET /api/health`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connectivity` or `AppError::Protocol` on transport failure.
    fn health(&self) -> BackendFuture<'_, HealthStatus>;
}
