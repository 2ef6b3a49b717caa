//! Parcel list controller.
//!
//! Fetches and reconciles the active and history lists, registers new
//! parcels, and issues box unlock/lock commands. Every failure is surfaced
//! to the user through [`Ui`] before being returned to the caller.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::backend::Backend;
use crate::errors::CONNECTION_ERROR_TEXT;
use crate::models::parcel::ParcelStatus;
use crate::models::response::{ApiResponse, ResponseKind};
use crate::ui::board::Controls;
use crate::ui::{MessageArea, Notice, NoticeLevel, Ui, UiEvent};
use crate::{AppError, Result};

/// Shown when a list fetch fails at the transport level.
const LIST_CONNECTION_ERROR_TEXT: &str = "Connection error. Please refresh.";

/// Drives the parcel lists and box commands.
pub struct ParcelListController {
    backend: Arc<dyn Backend>,
    ui: Ui,
}

impl ParcelListController {
    /// Create a controller over a backend and UI handle.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, ui: Ui) -> Self {
        Self { backend, ui }
    }

    /// Fetch and render the active list.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `AppError::Domain` with the
    /// backend's text; the list is cleared in both cases.
    pub async fn fetch_active(&self) -> Result<()> {
        self.fetch(ParcelStatus::Active).await
    }

    /// Fetch and render the history list.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `AppError::Domain` with the
    /// backend's text; the list is cleared in both cases.
    pub async fn fetch_history(&self) -> Result<()> {
        self.fetch(ParcelStatus::History).await
    }

    /// Refresh both lists; failures are already surfaced and only logged here.
    pub async fn refresh_all(&self) {
        if let Err(err) = self.fetch_active().await {
            warn!(%err, "active list refresh failed");
        }
        if let Err(err) = self.fetch_history().await {
            warn!(%err, "history list refresh failed");
        }
    }

    async fn fetch(&self, status: ParcelStatus) -> Result<()> {
        let span = info_span!("fetch_parcels", status = status.as_query());
        async move {
            let payload = match self.backend.fetch_parcels(status).await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, "parcel fetch failed");
                    self.ui
                        .show_message(
                            MessageArea::Parcels,
                            Notice::new(NoticeLevel::Error, LIST_CONNECTION_ERROR_TEXT),
                        )
                        .await;
                    self.ui.with_board(|board| board.clear_list(status)).await;
                    self.ui.emit(UiEvent::ListUpdated(status));
                    return Err(err);
                }
            };

            if payload.status.is_error() {
                let notice = Notice::from_response(&payload.status);
                warn!(error = %notice.text, "backend rejected parcel fetch");
                self.ui
                    .show_message(MessageArea::Parcels, notice.clone())
                    .await;
                self.ui.with_board(|board| board.clear_list(status)).await;
                self.ui.emit(UiEvent::ListUpdated(status));
                return Err(AppError::Domain(notice.text));
            }

            self.ui.clear_message(MessageArea::Parcels).await;
            let parcels = payload.parcels.unwrap_or_default();
            info!(count = parcels.len(), "parcel list fetched");
            self.ui
                .with_board(|board| board.set_list(status, parcels))
                .await;
            self.ui.emit(UiEvent::ListUpdated(status));
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Ask the backend to open the box holding `parcel_id`.
    ///
    /// On success the parcel's card switches to lock + collect actions.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `AppError::Domain`; controls are
    /// left unchanged.
    pub async fn unlock(&self, parcel_id: &str, box_id: &str) -> Result<()> {
        info!(parcel_id, box_id, "unlocking box");
        self.box_command(self.backend.open_box(parcel_id).await)?;
        self.set_controls(parcel_id, Controls::LockAndCollect).await;
        Ok(())
    }

    /// Ask the backend to lock `box_id`.
    ///
    /// On success the parcel's card switches back to the unlock action.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `AppError::Domain`; controls are
    /// left unchanged.
    pub async fn lock(&self, parcel_id: &str, box_id: &str) -> Result<()> {
        info!(parcel_id, box_id, "locking box");
        self.box_command(self.backend.lock_box(box_id).await)?;
        self.set_controls(parcel_id, Controls::Unlock).await;
        Ok(())
    }

    /// Surface the outcome of a box command; `Ok` only on backend success.
    fn box_command(&self, result: Result<ApiResponse>) -> Result<()> {
        match result {
            Ok(response) => {
                self.ui.toast_response(&response);
                if response.is_success() {
                    Ok(())
                } else {
                    warn!(error = ?response.text(), "box command rejected");
                    Err(domain_error(&response))
                }
            }
            Err(err) => {
                warn!(%err, "box command failed");
                self.ui.toast(NoticeLevel::Error, CONNECTION_ERROR_TEXT);
                Err(err)
            }
        }
    }

    async fn set_controls(&self, parcel_id: &str, controls: Controls) {
        let rendered = self
            .ui
            .with_board(|board| board.set_controls(parcel_id, controls))
            .await;
        if !rendered {
            warn!(parcel_id, "parcel card not rendered; controls applied on next refresh");
        }
        self.ui.emit(UiEvent::ControlsChanged {
            parcel_id: parcel_id.to_owned(),
            controls,
        });
    }

    /// Register a parcel id for the current user.
    ///
    /// Success and informational replies (e.g. already registered) clear
    /// the input and refresh the active list.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `AppError::Domain` with the
    /// backend's text.
    pub async fn register(&self, parcel_id: &str) -> Result<()> {
        info!(parcel_id, "registering parcel");
        let response = match self.backend.register_parcel(parcel_id).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "parcel registration failed");
                self.ui
                    .show_message(
                        MessageArea::Register,
                        Notice::new(NoticeLevel::Error, CONNECTION_ERROR_TEXT),
                    )
                    .await;
                return Err(err);
            }
        };

        self.ui
            .show_message(MessageArea::Register, Notice::from_response(&response))
            .await;

        if matches!(
            response.kind,
            Some(ResponseKind::Success | ResponseKind::Info)
        ) {
            self.ui.with_board(|board| board.register_input.clear()).await;
            self.ui.emit(UiEvent::RegisterInputCleared);
            if let Err(err) = self.fetch_active().await {
                warn!(%err, "active list refresh after registration failed");
            }
            Ok(())
        } else {
            Err(domain_error(&response))
        }
    }
}

/// Domain error carrying the backend's text.
pub(crate) fn domain_error(response: &ApiResponse) -> AppError {
    AppError::Domain(
        response
            .text()
            .unwrap_or("request rejected by backend")
            .to_owned(),
    )
}
