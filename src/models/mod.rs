//! Domain model module declarations.

use serde::{Deserialize, Deserializer};

pub mod attempt;
pub mod notification;
pub mod parcel;
pub mod response;

/// Identifier that the backend may encode as either a JSON string or number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

/// Deserialize an identifier as an opaque string.
///
/// Database-backed ids come out of the backend as integers while ids typed
/// by users are strings; both are treated as the same opaque key.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// Optional variant of [`deserialize_id`].
pub(crate) fn deserialize_opt_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}
