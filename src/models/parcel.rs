//! Parcel model as reported by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_opt_id};

/// Which parcel set to fetch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Registered parcels that have not been collected yet.
    Active,
    /// Parcels that have been collected.
    History,
}

impl ParcelStatus {
    /// Query-string value understood by `/api/fetch-parcels`.
    #[must_use]
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::History => "history",
        }
    }
}

/// UI state derived from a parcel's delivery and collection fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParcelState {
    /// Not yet delivered to the box.
    InTransit,
    /// Delivered and waiting for the owner to unlock the box.
    ReadyForUnlock,
    /// Collected; shown only in history.
    Collected,
}

/// A tracked delivery item associated with a locker box.
///
/// The client never mutates parcels; it only reflects server-confirmed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Parcel {
    /// Opaque parcel identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub parcel_name: String,
    /// Box the parcel is assigned to.
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub box_id: Option<String>,
    /// Box display name.
    #[serde(default)]
    pub box_name: Option<String>,
    /// Box location description.
    #[serde(default)]
    pub location: Option<String>,
    /// Whether the parcel has been placed in the box.
    #[serde(default)]
    pub is_delivered: bool,
    /// Delivery timestamp as sent by the backend.
    #[serde(default)]
    pub delivered_at: Option<String>,
    /// Collection timestamp (history only).
    #[serde(default)]
    pub collected_at: Option<String>,
}

impl Parcel {
    /// Derive the display state for a parcel in the given list.
    #[must_use]
    pub fn state(&self, list: ParcelStatus) -> ParcelState {
        match list {
            ParcelStatus::History => ParcelState::Collected,
            ParcelStatus::Active if self.is_delivered => ParcelState::ReadyForUnlock,
            ParcelStatus::Active => ParcelState::InTransit,
        }
    }

    /// Parsed delivery time, if present and well-formed.
    #[must_use]
    pub fn delivered_time(&self) -> Option<DateTime<Utc>> {
        self.delivered_at.as_deref().and_then(parse_timestamp)
    }

    /// Parsed collection time, if present and well-formed.
    #[must_use]
    pub fn collected_time(&self) -> Option<DateTime<Utc>> {
        self.collected_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse a backend timestamp.
///
/// The backend serializes datetimes as RFC 2822 (`Tue, 14 Oct 2025 10:00:00
/// GMT`); RFC 3339 and naive `YYYY-MM-DD HH:MM:SS` (assumed UTC) are also
/// accepted.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
