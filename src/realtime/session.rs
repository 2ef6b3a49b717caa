//! An explicitly owned notification channel session.
//!
//! [`ChannelSession::open`] spawns the subscription loop; [`ChannelSession::close`]
//! cancels it and waits for it to finish. Dropping a session cancels the
//! loop without waiting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::transport::{ChannelTransport, Cursor, SubscribeRequest};
use crate::AppError;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Connection-level status reported by the subscription loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// First poll succeeded.
    Connected,
    /// The token was rejected; the subscription has stopped.
    AccessDenied,
}

/// Events flowing from a subscription into the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Status change.
    Status(ChannelStatus),
    /// Raw inbound message payload.
    Message(serde_json::Value),
}

/// Live subscription to one channel with one token.
pub struct ChannelSession {
    request: SubscribeRequest,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelSession {
    /// Start polling `request.channel`, forwarding events to `events`.
    #[must_use]
    pub fn open(
        transport: Arc<dyn ChannelTransport>,
        request: SubscribeRequest,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let span = info_span!(
            "subscription",
            channel = %request.channel,
            client_id = %request.client_id,
        );
        let task = tokio::spawn(
            run_subscription(transport, request.clone(), events, cancel.clone()).instrument(span),
        );
        Self {
            request,
            cancel,
            task: Some(task),
        }
    }

    /// Subscription identity and credentials.
    #[must_use]
    pub fn request(&self) -> &SubscribeRequest {
        &self.request
    }

    /// Whether the subscription loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the subscription and wait for the loop to exit.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(%err, "subscription task ended abnormally");
            }
        }
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Poll until cancelled, access is denied, or the event receiver is gone.
async fn run_subscription(
    transport: Arc<dyn ChannelTransport>,
    request: SubscribeRequest,
    events: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let mut cursor = Cursor::default();
    let mut connected = false;
    let mut backoff = INITIAL_RETRY_DELAY;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = transport.poll(&request, &cursor) => result,
        };

        match result {
            Ok(batch) => {
                backoff = INITIAL_RETRY_DELAY;
                if !connected {
                    connected = true;
                    info!("notification channel connected");
                    if events
                        .send(ChannelEvent::Status(ChannelStatus::Connected))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                cursor = batch.cursor;
                for message in batch.messages {
                    if events.send(ChannelEvent::Message(message)).await.is_err() {
                        info!("event receiver dropped; ending subscription");
                        return;
                    }
                }
            }
            Err(AppError::Unauthorized(reason)) => {
                warn!(%reason, "notification channel access denied");
                let _ = events
                    .send(ChannelEvent::Status(ChannelStatus::AccessDenied))
                    .await;
                break;
            }
            Err(err) => {
                warn!(%err, delay = ?backoff, "notification poll failed; retrying");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_RETRY_DELAY);
            }
        }
    }

    info!("subscription loop exiting");
}
