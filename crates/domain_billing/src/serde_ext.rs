//! Serde helpers shared by the patch types

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent key from an explicit `null`
///
/// Used with `#[serde(default, deserialize_with = "deserialize_some")]` on
/// `Option<Option<T>>` fields: absent gives `None`, `null` gives `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
