//! Presentation state driven by the controller and collection workflow.
//!
//! Rendering is left to the embedding front end. This module owns the data
//! that decides what is shown ([`board::BoardState`]) and a stream of
//! [`UiEvent`]s for transient effects such as toasts and prompts.

pub mod board;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::models::parcel::ParcelStatus;
use crate::models::response::{ApiResponse, ResponseKind};

use self::board::{BoardState, Controls};

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Operation completed.
    Success,
    /// Operation failed.
    Error,
    /// Neutral information.
    Info,
    /// Advisory.
    Warning,
}

impl NoticeLevel {
    /// Level for a backend reply; replies without a discriminator read as errors.
    #[must_use]
    pub fn for_response(response: &ApiResponse) -> Self {
        match response.kind {
            Some(ResponseKind::Success) => Self::Success,
            Some(ResponseKind::Info | ResponseKind::WeightCheck | ResponseKind::Other) => {
                Self::Info
            }
            Some(ResponseKind::Warning) => Self::Warning,
            Some(ResponseKind::Error) | None => Self::Error,
        }
    }
}

/// A transient, dismissible piece of text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub text: String,
}

impl Notice {
    /// Construct a notice.
    #[must_use]
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// Notice for a backend reply, falling back to a generic error text.
    #[must_use]
    pub fn from_response(response: &ApiResponse) -> Self {
        Self::new(
            NoticeLevel::for_response(response),
            response.text().unwrap_or("An error occurred"),
        )
    }
}

/// Inline message areas on the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageArea {
    /// Above the parcel lists.
    Parcels,
    /// Below the registration form.
    Register,
}

/// Transient UI effects emitted alongside board updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Pop-up notification.
    Toast(Notice),
    /// A message area was set (`Some`) or cleared (`None`).
    Message {
        /// Target area.
        area: MessageArea,
        /// New content.
        notice: Option<Notice>,
    },
    /// A parcel list was re-rendered.
    ListUpdated(ParcelStatus),
    /// The action buttons of a parcel changed.
    ControlsChanged {
        /// Parcel whose card changed.
        parcel_id: String,
        /// Buttons now shown.
        controls: Controls,
    },
    /// Ask the user whether to collect despite residual weight.
    ConfirmOverride {
        /// Parcel awaiting the decision.
        parcel_id: String,
    },
    /// The override prompt was closed.
    ConfirmClosed {
        /// Parcel whose prompt closed.
        parcel_id: String,
    },
    /// A collected parcel's card is fading out ahead of the list refresh.
    CardRemoving {
        /// Parcel being removed.
        parcel_id: String,
    },
    /// The registration input was cleared.
    RegisterInputCleared,
}

/// Shared handle to the board state and the UI event stream.
#[derive(Debug, Clone)]
pub struct Ui {
    board: Arc<Mutex<BoardState>>,
    events: mpsc::UnboundedSender<UiEvent>,
}

impl Ui {
    /// Create a UI handle and the receiving end of its event stream.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                board: Arc::new(Mutex::new(BoardState::default())),
                events,
            },
            rx,
        )
    }

    /// Snapshot of the current board.
    pub async fn board(&self) -> BoardState {
        self.board.lock().await.clone()
    }

    /// Run `f` with exclusive access to the board.
    pub async fn with_board<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        let mut board = self.board.lock().await;
        f(&mut board)
    }

    /// Emit a raw event. Events are dropped once the receiver is gone.
    pub fn emit(&self, event: UiEvent) {
        if self.events.send(event).is_err() {
            debug!("ui event receiver dropped");
        }
    }

    /// Show a toast.
    pub fn toast(&self, level: NoticeLevel, text: impl Into<String>) {
        self.emit(UiEvent::Toast(Notice::new(level, text)));
    }

    /// Toast a backend reply's text, if it carries any.
    pub fn toast_response(&self, response: &ApiResponse) {
        if let Some(text) = response.text() {
            self.toast(NoticeLevel::for_response(response), text);
        }
    }

    /// Set a message area.
    pub async fn show_message(&self, area: MessageArea, notice: Notice) {
        self.with_board(|board| *board.message_mut(area) = Some(notice.clone()))
            .await;
        self.emit(UiEvent::Message {
            area,
            notice: Some(notice),
        });
    }

    /// Clear a message area.
    pub async fn clear_message(&self, area: MessageArea) {
        let had_message = self
            .with_board(|board| board.message_mut(area).take().is_some())
            .await;
        if had_message {
            self.emit(UiEvent::Message { area, notice: None });
        }
    }

    /// Open the residual-weight override prompt.
    pub async fn open_confirm(&self, parcel_id: &str) {
        self.with_board(|board| {
            if !board.confirm_prompts.iter().any(|id| id == parcel_id) {
                board.confirm_prompts.push(parcel_id.to_owned());
            }
        })
        .await;
        self.emit(UiEvent::ConfirmOverride {
            parcel_id: parcel_id.to_owned(),
        });
    }

    /// Close the override prompt for `parcel_id`, if open.
    pub async fn close_confirm(&self, parcel_id: &str) {
        let closed = self
            .with_board(|board| {
                let before = board.confirm_prompts.len();
                board.confirm_prompts.retain(|id| id != parcel_id);
                board.confirm_prompts.len() != before
            })
            .await;
        if closed {
            self.emit(UiEvent::ConfirmClosed {
                parcel_id: parcel_id.to_owned(),
            });
        }
    }
}
