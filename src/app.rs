//! Application wiring.
//!
//! [`LockerApp`] owns one instance of each component and connects them: the
//! dispatcher routes deliveries to the list controller and weight readings
//! to the collection workflow.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backend::client::HttpBackend;
use crate::backend::Backend;
use crate::config::GlobalConfig;
use crate::controller::parcels::ParcelListController;
use crate::models::notification::WeightCheckResponse;
use crate::realtime::client::{ConnectOutcome, NotificationClient};
use crate::realtime::dispatch::{
    DeliveryNotice, DeliveryProjection, ListenerFuture, MessageDispatcher, NotificationListener,
};
use crate::realtime::transport::{ChannelTransport, PubNubTransport};
use crate::ui::{MessageArea, Notice, NoticeLevel, Ui, UiEvent};
use crate::workflow::collection::CollectionWorkflow;
use crate::Result;

/// Text of the delivery notice shown above the parcel lists.
#[must_use]
pub fn delivery_text(parcel_name: &str, box_name: &str) -> String {
    format!("\u{1f4e6} Your parcel \"{parcel_name}\" has been delivered to {box_name}!")
}

/// Routes classified notifications into the controller and workflow.
pub struct LockerListener {
    parcels: Arc<ParcelListController>,
    collection: Arc<CollectionWorkflow>,
    ui: Ui,
}

impl LockerListener {
    /// Create a listener.
    #[must_use]
    pub fn new(
        parcels: Arc<ParcelListController>,
        collection: Arc<CollectionWorkflow>,
        ui: Ui,
    ) -> Self {
        Self {
            parcels,
            collection,
            ui,
        }
    }
}

impl NotificationListener for LockerListener {
    fn on_parcel_delivered<'a>(&'a self, notice: &'a DeliveryNotice) -> ListenerFuture<'a> {
        Box::pin(async move {
            self.ui
                .show_message(
                    MessageArea::Parcels,
                    Notice::new(
                        NoticeLevel::Success,
                        delivery_text(&notice.parcel_name, &notice.box_name),
                    ),
                )
                .await;
            if let Err(err) = self.parcels.fetch_active().await {
                warn!(%err, "active list refresh after delivery failed");
            }
        })
    }

    fn on_weight_check<'a>(&'a self, response: &'a WeightCheckResponse) -> ListenerFuture<'a> {
        Box::pin(async move {
            if !self
                .collection
                .resolve_weight_check(&response.parcel_id, response.has_weight)
            {
                info!(
                    parcel_id = %response.parcel_id,
                    "weight reading had no waiting collection"
                );
            }
        })
    }
}

/// Fully wired client.
pub struct LockerApp {
    config: GlobalConfig,
    backend: Arc<dyn Backend>,
    ui: Ui,
    parcels: Arc<ParcelListController>,
    collection: Arc<CollectionWorkflow>,
    notifications: Arc<NotificationClient>,
}

impl LockerApp {
    /// Wire the components over the given backend and channel transport.
    #[must_use]
    pub fn new(
        config: GlobalConfig,
        backend: Arc<dyn Backend>,
        transport: Arc<dyn ChannelTransport>,
        projection: DeliveryProjection,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (ui, events) = Ui::new();
        let parcels = Arc::new(ParcelListController::new(Arc::clone(&backend), ui.clone()));
        let collection = Arc::new(CollectionWorkflow::new(
            Arc::clone(&backend),
            Arc::clone(&parcels),
            ui.clone(),
            config.weight_check_timeout(),
            config.removal_delay(),
        ));
        let listener = Arc::new(LockerListener::new(
            Arc::clone(&parcels),
            Arc::clone(&collection),
            ui.clone(),
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(listener, projection));
        let notifications = Arc::new(NotificationClient::new(
            transport,
            Arc::clone(&backend),
            dispatcher,
            config.realtime.client_id_style,
        ));

        (
            Self {
                config,
                backend,
                ui,
                parcels,
                collection,
                notifications,
            },
            events,
        )
    }

    /// Wire the HTTP backend and `PubNub` transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if either HTTP client cannot be built.
    pub fn from_config(
        config: GlobalConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<UiEvent>)> {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config)?);
        let transport: Arc<dyn ChannelTransport> = Arc::new(PubNubTransport::new(&config)?);
        Ok(Self::new(config, backend, transport, DeliveryProjection::Minimal))
    }

    /// Page-load sequence: render both lists, then subscribe.
    ///
    /// Without a configured channel token one is requested from the
    /// backend; if none is issued, notifications stay disabled.
    pub async fn start(&self) -> ConnectOutcome {
        self.parcels.refresh_all().await;
        self.connect_notifications().await
    }

    /// Subscribe to the user's notification channel.
    pub async fn connect_notifications(&self) -> ConnectOutcome {
        let token = match self.config.realtime.token.clone() {
            Some(token) => Some(token),
            None if self.config.realtime.subscribe_key.is_some() => {
                match self.backend.channel_token().await {
                    Ok(token) => token,
                    Err(err) => {
                        warn!(%err, "could not obtain channel token");
                        None
                    }
                }
            }
            None => None,
        };

        self.notifications
            .connect(
                &self.config.user_id,
                self.config.realtime.subscribe_key.as_deref(),
                token.as_deref(),
            )
            .await
    }

    /// Close the notification session.
    pub async fn shutdown(&self) {
        self.notifications.disconnect().await;
        info!("locker client shut down");
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Backend handle.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// UI handle.
    #[must_use]
    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Parcel list controller.
    #[must_use]
    pub fn parcels(&self) -> &Arc<ParcelListController> {
        &self.parcels
    }

    /// Collection workflow.
    #[must_use]
    pub fn collection(&self) -> &Arc<CollectionWorkflow> {
        &self.collection
    }

    /// Notification channel client.
    #[must_use]
    pub fn notifications(&self) -> &Arc<NotificationClient> {
        &self.notifications
    }
}
