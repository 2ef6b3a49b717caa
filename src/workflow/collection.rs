//! Weight-checked parcel collection.
//!
//! `collect` asks the backend to mark a parcel collected. The backend either
//! answers immediately or replies `weight_check`, in which case the load
//! cell is consulted and its reading arrives later on the notification
//! channel. An empty box completes the collection with a forced request;
//! residual weight suspends the attempt until the user overrides
//! ([`CollectionWorkflow::confirm_override`]) or cancels
//! ([`CollectionWorkflow::cancel`]).
//!
//! Attempts are keyed by parcel id so concurrent collections of different
//! parcels resolve independently. The wait for a reading is bounded, and an
//! attempt whose caller stops polling it is discarded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::Backend;
use crate::controller::parcels::{domain_error, ParcelListController};
use crate::models::attempt::{AttemptState, CollectionOutcome};
use crate::models::response::{ApiResponse, ResponseKind};
use crate::ui::{NoticeLevel, Ui, UiEvent};
use crate::{AppError, Result};

/// Toast shown while the first mark-collected request is in flight.
const CHECKING_TEXT: &str = "Checking if parcel was removed...";

/// Outstanding attempt for one parcel.
#[derive(Debug)]
struct PendingAttempt {
    /// Correlates log records of one attempt.
    attempt_id: Uuid,
    state: AttemptState,
    /// Resolves the bounded wait in `await_weight_check`.
    waiter: Option<oneshot::Sender<bool>>,
    /// Reading that arrived before the backend's `weight_check` reply.
    early_reading: Option<bool>,
}

impl PendingAttempt {
    fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            state: AttemptState::Requested,
            waiter: None,
            early_reading: None,
        }
    }
}

type AttemptMap = HashMap<String, PendingAttempt>;

fn lock_attempts(attempts: &Mutex<AttemptMap>) -> MutexGuard<'_, AttemptMap> {
    attempts.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Discards an attempt when its future is dropped before resolving.
///
/// Attempts parked in `ConfirmPending` survive; they belong to the
/// confirmation prompt.
struct AttemptGuard<'a> {
    attempts: &'a Mutex<AttemptMap>,
    parcel_id: &'a str,
    attempt_id: Uuid,
    armed: bool,
}

impl AttemptGuard<'_> {
    /// The attempt settled on its own; leave the map alone.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut attempts = lock_attempts(self.attempts);
        let abandoned = attempts.get(self.parcel_id).is_some_and(|attempt| {
            attempt.attempt_id == self.attempt_id && attempt.state != AttemptState::ConfirmPending
        });
        if abandoned {
            attempts.remove(self.parcel_id);
            warn!(
                parcel_id = self.parcel_id,
                attempt_id = %self.attempt_id,
                "collection attempt abandoned by caller"
            );
        }
    }
}

/// Orchestrates mark-collected requests and weight-check readings.
pub struct CollectionWorkflow {
    backend: Arc<dyn Backend>,
    lists: Arc<ParcelListController>,
    ui: Ui,
    attempts: Mutex<AttemptMap>,
    weight_check_timeout: Duration,
    removal_delay: Duration,
}

impl CollectionWorkflow {
    /// Create a workflow.
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        lists: Arc<ParcelListController>,
        ui: Ui,
        weight_check_timeout: Duration,
        removal_delay: Duration,
    ) -> Self {
        Self {
            backend,
            lists,
            ui,
            attempts: Mutex::new(HashMap::new()),
            weight_check_timeout,
            removal_delay,
        }
    }

    /// Current attempt state for a parcel; `None` means idle.
    pub fn state(&self, parcel_id: &str) -> Option<AttemptState> {
        lock_attempts(&self.attempts)
            .get(parcel_id)
            .map(|attempt| attempt.state)
    }

    /// Number of outstanding attempts.
    pub fn pending_count(&self) -> usize {
        lock_attempts(&self.attempts).len()
    }

    /// Mark a parcel collected, waiting for the weight check if required.
    ///
    /// Returns [`CollectionOutcome::ConfirmationRequired`] when the box
    /// still reports weight; the attempt then stays open for
    /// [`Self::confirm_override`] or [`Self::cancel`].
    ///
    /// # Errors
    ///
    /// - `AppError::AlreadyPending` if this parcel already has an attempt.
    /// - `AppError::Domain` when the backend rejects the collection.
    /// - `AppError::Timeout` when no reading arrives in time.
    /// - Transport errors from the backend.
    pub async fn collect(&self, parcel_id: &str) -> Result<CollectionOutcome> {
        let attempt_id = self.begin(parcel_id)?;
        let span = info_span!("collect", parcel_id, %attempt_id);
        let guard = self.guard(parcel_id, attempt_id);

        let outcome = async move {
            self.ui.toast(NoticeLevel::Info, CHECKING_TEXT);

            let response = match self.backend.mark_collected(parcel_id, false).await {
                Ok(response) => response,
                Err(err) => return Err(self.fail(parcel_id, err)),
            };

            match response.kind {
                Some(ResponseKind::WeightCheck) => self.await_weight_check(parcel_id).await,
                Some(ResponseKind::Success) => {
                    self.finish(parcel_id);
                    info!("parcel collected without weight check");
                    self.ui.toast_response(&response);
                    self.lists.refresh_all().await;
                    Ok(CollectionOutcome::Collected)
                }
                _ => Err(self.reject(parcel_id, &response)),
            }
        }
        .instrument(span)
        .await;
        guard.disarm();
        outcome
    }

    /// Feed a weight-check reading into the matching attempt.
    ///
    /// Returns `false` when no attempt for `parcel_id` is waiting for one.
    pub fn resolve_weight_check(&self, parcel_id: &str, has_weight: bool) -> bool {
        let mut attempts = lock_attempts(&self.attempts);
        let Some(attempt) = attempts.get_mut(parcel_id) else {
            debug!(parcel_id, "weight reading for idle parcel ignored");
            return false;
        };

        match attempt.state {
            AttemptState::AwaitingWeightCheck => match attempt.waiter.take() {
                Some(waiter) => {
                    if waiter.send(has_weight).is_ok() {
                        return true;
                    }
                    warn!(parcel_id, "weight check waiter gone; discarding attempt");
                    attempts.remove(parcel_id);
                    false
                }
                None => {
                    debug!(parcel_id, "weight reading already delivered; ignoring");
                    false
                }
            },
            AttemptState::Requested => {
                debug!(parcel_id, has_weight, "weight reading arrived early; buffering");
                attempt.early_reading = Some(has_weight);
                true
            }
            AttemptState::ConfirmPending => {
                debug!(parcel_id, "weight reading while awaiting confirmation ignored");
                false
            }
        }
    }

    /// Collect despite residual weight, after explicit user confirmation.
    ///
    /// On success the card removal is signalled, then lists are refreshed
    /// after the configured removal delay.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` if the parcel is not awaiting confirmation.
    /// - `AppError::Domain` or transport errors from the forced request.
    pub async fn confirm_override(&self, parcel_id: &str) -> Result<CollectionOutcome> {
        let attempt_id = {
            let mut attempts = lock_attempts(&self.attempts);
            match attempts.get_mut(parcel_id) {
                Some(attempt) if attempt.state == AttemptState::ConfirmPending => {
                    attempt.state = AttemptState::Requested;
                    attempt.attempt_id
                }
                _ => {
                    return Err(AppError::NotFound(format!(
                        "no collection awaiting confirmation for parcel {parcel_id}"
                    )))
                }
            }
        };
        let span = info_span!("confirm_override", parcel_id, %attempt_id);
        let guard = self.guard(parcel_id, attempt_id);

        let outcome = async move {
            info!("user overrode residual weight warning");
            let result = self.backend.mark_collected(parcel_id, true).await;
            self.ui.close_confirm(parcel_id).await;

            let response = match result {
                Ok(response) => response,
                Err(err) => return Err(self.fail(parcel_id, err)),
            };
            if !response.is_success() {
                return Err(self.reject(parcel_id, &response));
            }

            self.finish(parcel_id);
            info!("parcel collected by override");
            self.ui.toast_response(&response);
            self.ui.emit(UiEvent::CardRemoving {
                parcel_id: parcel_id.to_owned(),
            });
            tokio::time::sleep(self.removal_delay).await;
            self.lists.refresh_all().await;
            Ok(CollectionOutcome::Collected)
        }
        .instrument(span)
        .await;
        guard.disarm();
        outcome
    }

    /// Dismiss the residual-weight prompt without collecting.
    ///
    /// Issues no backend call. Returns `false` if the parcel was not
    /// awaiting confirmation.
    pub async fn cancel(&self, parcel_id: &str) -> bool {
        let removed = {
            let mut attempts = lock_attempts(&self.attempts);
            match attempts.get(parcel_id) {
                Some(attempt) if attempt.state == AttemptState::ConfirmPending => {
                    attempts.remove(parcel_id)
                }
                _ => None,
            }
        };

        match removed {
            Some(attempt) => {
                info!(parcel_id, attempt_id = %attempt.attempt_id, "collection cancelled by user");
                self.ui.close_confirm(parcel_id).await;
                true
            }
            None => {
                debug!(parcel_id, "nothing to cancel");
                false
            }
        }
    }

    /// Register a new attempt, rejecting re-entrant submissions.
    fn begin(&self, parcel_id: &str) -> Result<Uuid> {
        let mut attempts = lock_attempts(&self.attempts);
        if let Some(existing) = attempts.get(parcel_id) {
            warn!(
                parcel_id,
                state = ?existing.state,
                "collection already in progress"
            );
            let err = AppError::AlreadyPending(format!(
                "collection of parcel {parcel_id} is already in progress"
            ));
            self.ui.toast(NoticeLevel::Info, err.user_message());
            return Err(err);
        }
        let attempt = PendingAttempt::new();
        let attempt_id = attempt.attempt_id;
        attempts.insert(parcel_id.to_owned(), attempt);
        Ok(attempt_id)
    }

    fn guard<'a>(&'a self, parcel_id: &'a str, attempt_id: Uuid) -> AttemptGuard<'a> {
        AttemptGuard {
            attempts: &self.attempts,
            parcel_id,
            attempt_id,
            armed: true,
        }
    }

    async fn await_weight_check(&self, parcel_id: &str) -> Result<CollectionOutcome> {
        let reading = {
            let mut attempts = lock_attempts(&self.attempts);
            let Some(attempt) = attempts.get_mut(parcel_id) else {
                return Err(AppError::NotFound(format!(
                    "collection attempt for parcel {parcel_id} vanished"
                )));
            };
            attempt.state = AttemptState::AwaitingWeightCheck;
            let (tx, rx) = oneshot::channel();
            match attempt.early_reading.take() {
                Some(has_weight) => {
                    let _ = tx.send(has_weight);
                }
                None => attempt.waiter = Some(tx),
            }
            rx
        };

        info!(
            timeout_seconds = self.weight_check_timeout.as_secs(),
            "awaiting weight check reading"
        );

        match tokio::time::timeout(self.weight_check_timeout, reading).await {
            Ok(Ok(false)) => {
                info!("box reported empty; completing collection");
                self.force_collect(parcel_id).await
            }
            Ok(Ok(true)) => {
                if let Some(attempt) = lock_attempts(&self.attempts).get_mut(parcel_id) {
                    attempt.state = AttemptState::ConfirmPending;
                }
                info!("box still reports weight; asking user to confirm");
                self.ui.open_confirm(parcel_id).await;
                Ok(CollectionOutcome::ConfirmationRequired)
            }
            Ok(Err(_)) => Err(self.fail(
                parcel_id,
                AppError::Channel("weight check abandoned".into()),
            )),
            Err(_elapsed) => Err(self.fail(
                parcel_id,
                AppError::Timeout(format!(
                    "no weight reading within {} seconds",
                    self.weight_check_timeout.as_secs()
                )),
            )),
        }
    }

    /// Forced mark-collected after an empty reading.
    async fn force_collect(&self, parcel_id: &str) -> Result<CollectionOutcome> {
        let response = match self.backend.mark_collected(parcel_id, true).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(parcel_id, err)),
        };
        if !response.is_success() {
            return Err(self.reject(parcel_id, &response));
        }
        self.finish(parcel_id);
        info!("parcel collected after empty reading");
        self.ui.toast_response(&response);
        self.lists.refresh_all().await;
        Ok(CollectionOutcome::Collected)
    }

    fn finish(&self, parcel_id: &str) {
        lock_attempts(&self.attempts).remove(parcel_id);
    }

    /// Resolve an attempt as failed and surface `err`.
    fn fail(&self, parcel_id: &str, err: AppError) -> AppError {
        self.finish(parcel_id);
        warn!(%err, "collection failed");
        self.ui.toast(NoticeLevel::Error, err.user_message());
        err
    }

    /// Resolve an attempt rejected by the backend.
    fn reject(&self, parcel_id: &str, response: &ApiResponse) -> AppError {
        self.finish(parcel_id);
        warn!(reply = ?response.text(), "collection rejected by backend");
        self.ui.toast_response(response);
        domain_error(response)
    }
}
