//! Notification channel client.
//!
//! Owns at most one [`ChannelSession`] at a time and the event pump that
//! feeds its messages to the [`MessageDispatcher`]. When the channel
//! rejects the token, the client runs a single-flight refresh: fetch a new
//! token from the backend, close the old session and open a new one.
//! Access-denied statuses arriving while a refresh is in flight are
//! ignored. If the refreshed session is denied before it ever connects,
//! real-time notifications stop; there is no second refresh.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::dispatch::MessageDispatcher;
use super::session::{ChannelEvent, ChannelSession, ChannelStatus};
use super::transport::{ChannelTransport, SubscribeRequest};
use crate::backend::Backend;
use crate::config::{channel_name, client_id, is_placeholder, ClientIdStyle};

const EVENT_CAPACITY: usize = 256;

/// Result of [`NotificationClient::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A subscription was opened.
    Connected,
    /// Credentials are missing; real-time notifications are disabled.
    Disabled,
}

/// State that exists only while connected.
struct Live {
    /// Distinguishes this connection from later ones.
    generation: u64,
    request: SubscribeRequest,
    session: Option<ChannelSession>,
    events_tx: mpsc::Sender<ChannelEvent>,
    pump: JoinHandle<()>,
    pump_cancel: CancellationToken,
}

/// Manages the subscription lifecycle to the per-user channel.
pub struct NotificationClient {
    transport: Arc<dyn ChannelTransport>,
    backend: Arc<dyn Backend>,
    dispatcher: Arc<MessageDispatcher>,
    client_id_style: ClientIdStyle,
    live: Mutex<Option<Live>>,
    generation: AtomicU64,
    refreshing: AtomicBool,
    /// Set while a session opened with a refreshed token has not yet
    /// completed a poll.
    refreshed_unconfirmed: AtomicBool,
    connected: watch::Sender<bool>,
}

impl NotificationClient {
    /// Create a disconnected client.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        backend: Arc<dyn Backend>,
        dispatcher: Arc<MessageDispatcher>,
        client_id_style: ClientIdStyle,
    ) -> Self {
        Self {
            transport,
            backend,
            dispatcher,
            client_id_style,
            live: Mutex::new(None),
            generation: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
            refreshed_unconfirmed: AtomicBool::new(false),
            connected: watch::channel(false).0,
        }
    }

    /// Subscribe to `user-<user_id>`.
    ///
    /// Missing or placeholder credentials disable real-time notifications
    /// instead of failing. An existing session is replaced.
    pub async fn connect(
        self: &Arc<Self>,
        user_id: &str,
        subscribe_key: Option<&str>,
        token: Option<&str>,
    ) -> ConnectOutcome {
        let Some(subscribe_key) = subscribe_key.filter(|key| !is_placeholder(key)) else {
            warn!("subscribe key not configured; real-time notifications disabled");
            return ConnectOutcome::Disabled;
        };
        let Some(token) = token.filter(|token| !is_placeholder(token)) else {
            warn!("channel token not available; real-time notifications disabled");
            return ConnectOutcome::Disabled;
        };

        let request = SubscribeRequest {
            subscribe_key: subscribe_key.to_owned(),
            channel: channel_name(user_id),
            client_id: client_id(user_id, self.client_id_style),
            token: token.to_owned(),
        };

        let mut live = self.live.lock().await;
        if let Some(previous) = live.take() {
            info!("replacing existing notification session");
            previous.shutdown().await;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.refreshed_unconfirmed.store(false, Ordering::SeqCst);
        self.connected.send_replace(false);

        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let pump_cancel = CancellationToken::new();
        let pump = tokio::spawn(
            Arc::clone(self)
                .pump(events_rx, pump_cancel.clone())
                .instrument(info_span!("notification_pump")),
        );

        info!(
            channel = %request.channel,
            client_id = %request.client_id,
            "subscribing to notification channel"
        );
        let session = ChannelSession::open(
            Arc::clone(&self.transport),
            request.clone(),
            events_tx.clone(),
        );

        *live = Some(Live {
            generation,
            request,
            session: Some(session),
            events_tx,
            pump,
            pump_cancel,
        });
        ConnectOutcome::Connected
    }

    /// Unsubscribe and stop the event pump. Idempotent.
    pub async fn disconnect(&self) {
        let live = self.live.lock().await.take();
        self.refreshed_unconfirmed.store(false, Ordering::SeqCst);
        self.connected.send_replace(false);
        match live {
            Some(live) => {
                live.shutdown().await;
                info!("notification channel disconnected");
            }
            None => debug!("no notification session to disconnect"),
        }
    }

    /// Whether a session is currently held.
    pub async fn is_connected(&self) -> bool {
        self.live.lock().await.is_some()
    }

    /// Token of the current session, if any.
    pub async fn current_token(&self) -> Option<String> {
        self.live
            .lock()
            .await
            .as_ref()
            .map(|live| live.request.token.clone())
    }

    /// Whether a token refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Wait until the current session completes its first poll.
    ///
    /// Returns `false` if that does not happen within `limit`.
    pub async fn wait_connected(&self, limit: Duration) -> bool {
        let mut connected = self.connected.subscribe();
        let ok = matches!(
            tokio::time::timeout(limit, connected.wait_for(|connected| *connected)).await,
            Ok(Ok(_))
        );
        ok
    }

    /// React to a status reported by the subscription.
    ///
    /// `AccessDenied` starts a token refresh unless one is already running
    /// or the denied session was itself opened by a refresh.
    pub fn handle_status(self: &Arc<Self>, status: ChannelStatus) {
        match status {
            ChannelStatus::Connected => {
                if self.refreshed_unconfirmed.swap(false, Ordering::SeqCst) {
                    info!("refreshed channel token accepted");
                } else {
                    debug!("channel reported connected");
                }
                self.connected.send_replace(true);
            }
            ChannelStatus::AccessDenied => {
                self.connected.send_replace(false);
                if self.refreshed_unconfirmed.swap(false, Ordering::SeqCst) {
                    warn!("refreshed channel token rejected; real-time notifications stopped");
                    return;
                }
                if self
                    .refreshing
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    debug!("token refresh already in progress; ignoring access denied");
                    return;
                }
                let generation = self.generation.load(Ordering::SeqCst);
                tokio::spawn(
                    Arc::clone(self)
                        .refresh_token(generation)
                        .instrument(info_span!("token_refresh", generation)),
                );
            }
        }
    }

    async fn pump(
        self: Arc<Self>,
        mut events_rx: mpsc::Receiver<ChannelEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                event = events_rx.recv() => event,
            };
            match event {
                Some(ChannelEvent::Message(message)) => {
                    info!(?message, "notification received");
                    self.dispatcher.dispatch(&message).await;
                }
                Some(ChannelEvent::Status(status)) => self.handle_status(status),
                None => break,
            }
        }
        debug!("notification pump exiting");
    }

    /// Fetch a new token and reconnect connection `generation` with it.
    ///
    /// A reply without a token abandons the cycle; no retry follows. A
    /// connection replaced or closed meanwhile is left alone.
    async fn refresh_token(self: Arc<Self>, generation: u64) {
        info!("refreshing notification channel token");

        let token = match self.backend.channel_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("token refresh returned no token; real-time notifications stopped");
                self.refreshing.store(false, Ordering::SeqCst);
                return;
            }
            Err(err) => {
                warn!(%err, "token refresh failed; real-time notifications stopped");
                self.refreshing.store(false, Ordering::SeqCst);
                return;
            }
        };

        {
            let mut guard = self.live.lock().await;
            match guard.as_mut() {
                Some(live) if live.generation == generation => {
                    if let Some(previous) = live.session.take() {
                        previous.close().await;
                    }
                    live.request.token = token;
                    self.refreshed_unconfirmed.store(true, Ordering::SeqCst);
                    live.session = Some(ChannelSession::open(
                        Arc::clone(&self.transport),
                        live.request.clone(),
                        live.events_tx.clone(),
                    ));
                    info!("reconnected with refreshed token");
                }
                Some(_) => info!("session replaced during token refresh; keeping its token"),
                None => info!("session closed during token refresh; not reconnecting"),
            }
        }

        self.refreshing.store(false, Ordering::SeqCst);
    }
}

impl Live {
    async fn shutdown(self) {
        if let Some(session) = self.session {
            session.close().await;
        }
        self.pump_cancel.cancel();
        if let Err(err) = self.pump.await {
            warn!(%err, "notification pump ended abnormally");
        }
    }
}
