//! Dashboard board state: parcel lists, per-parcel controls, message areas.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{MessageArea, Notice};
use crate::models::parcel::{Parcel, ParcelState, ParcelStatus};

/// Action buttons shown on a parcel card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Controls {
    /// No actions (in transit, or collected).
    None,
    /// Only "Unlock Box".
    Unlock,
    /// "Lock Box" and "Collected", shown after a successful unlock.
    LockAndCollect,
}

/// One rendered parcel entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParcelCard {
    /// Parcel as reported by the backend.
    pub parcel: Parcel,
    /// Derived display state.
    pub state: ParcelState,
    /// Buttons currently offered.
    pub controls: Controls,
}

/// Contents of a parcel list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListView {
    /// Nothing rendered (initial, or cleared after an error).
    #[default]
    Cleared,
    /// Fetched successfully but empty; shows the empty-state indicator.
    Empty,
    /// Rendered entries.
    Entries(Vec<ParcelCard>),
}

impl ListView {
    /// Rendered cards, empty unless the list holds entries.
    #[must_use]
    pub fn cards(&self) -> &[ParcelCard] {
        match self {
            Self::Entries(cards) => cards,
            Self::Cleared | Self::Empty => &[],
        }
    }
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    /// Active parcels.
    pub active: ListView,
    /// Collected parcels.
    pub history: ListView,
    /// Message area above the lists.
    pub parcels_message: Option<Notice>,
    /// Message area under the registration form.
    pub register_message: Option<Notice>,
    /// Registration form input.
    pub register_input: String,
    /// Parcels with an open residual-weight prompt, oldest first.
    pub confirm_prompts: Vec<String>,
    /// Controls from the last successful unlock/lock, by parcel id.
    control_overrides: HashMap<String, Controls>,
}

impl BoardState {
    /// List view for a parcel set.
    #[must_use]
    pub fn list(&self, status: ParcelStatus) -> &ListView {
        match status {
            ParcelStatus::Active => &self.active,
            ParcelStatus::History => &self.history,
        }
    }

    fn list_mut(&mut self, status: ParcelStatus) -> &mut ListView {
        match status {
            ParcelStatus::Active => &mut self.active,
            ParcelStatus::History => &mut self.history,
        }
    }

    /// Mutable access to a message area.
    pub fn message_mut(&mut self, area: MessageArea) -> &mut Option<Notice> {
        match area {
            MessageArea::Parcels => &mut self.parcels_message,
            MessageArea::Register => &mut self.register_message,
        }
    }

    /// Current content of a message area.
    #[must_use]
    pub fn message(&self, area: MessageArea) -> Option<&Notice> {
        match area {
            MessageArea::Parcels => self.parcels_message.as_ref(),
            MessageArea::Register => self.register_message.as_ref(),
        }
    }

    /// Replace a list with freshly fetched parcels.
    ///
    /// Unlock/lock state is kept for parcels still ready for unlock and
    /// forgotten for everything else.
    pub fn set_list(&mut self, status: ParcelStatus, parcels: Vec<Parcel>) {
        if status == ParcelStatus::Active {
            self.control_overrides.retain(|id, _| {
                parcels
                    .iter()
                    .any(|parcel| &parcel.id == id && parcel.is_delivered)
            });
        }

        let cards: Vec<ParcelCard> = parcels
            .into_iter()
            .map(|parcel| {
                let state = parcel.state(status);
                let controls = match state {
                    ParcelState::ReadyForUnlock => self
                        .control_overrides
                        .get(&parcel.id)
                        .copied()
                        .unwrap_or(Controls::Unlock),
                    ParcelState::InTransit | ParcelState::Collected => Controls::None,
                };
                ParcelCard {
                    parcel,
                    state,
                    controls,
                }
            })
            .collect();

        *self.list_mut(status) = if cards.is_empty() {
            ListView::Empty
        } else {
            ListView::Entries(cards)
        };
    }

    /// Clear a list after a failed fetch.
    pub fn clear_list(&mut self, status: ParcelStatus) {
        *self.list_mut(status) = ListView::Cleared;
    }

    /// Record the controls produced by a successful unlock or lock.
    ///
    /// Returns `false` when the parcel is not rendered as ready for unlock;
    /// the override is still remembered for the next render.
    pub fn set_controls(&mut self, parcel_id: &str, controls: Controls) -> bool {
        self.control_overrides.insert(parcel_id.to_owned(), controls);
        match self.active {
            ListView::Entries(ref mut cards) => cards
                .iter_mut()
                .find(|card| card.parcel.id == parcel_id && card.state == ParcelState::ReadyForUnlock)
                .map(|card| card.controls = controls)
                .is_some(),
            ListView::Cleared | ListView::Empty => false,
        }
    }

    /// Card for a parcel in the given list.
    #[must_use]
    pub fn card(&self, status: ParcelStatus, parcel_id: &str) -> Option<&ParcelCard> {
        self.list(status)
            .cards()
            .iter()
            .find(|card| card.parcel.id == parcel_id)
    }
}
