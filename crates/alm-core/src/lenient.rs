//! Lenient field decoding.
//!
//! Upstream payloads are sometimes partially malformed. Every wire field in
//! [`crate::entities`] is tagged `#[serde(default, deserialize_with = "...")]`
//! with one of these helpers so that a missing, `null`, or mistyped field is
//! replaced by its default instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode a field, falling back to `T::default()` on any shape mismatch.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce a JSON value at
/// all (never the case for `serde_json` input).
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce(value))
}

/// Decode a sequence, dropping elements that cannot be decoded.
///
/// A non-array value yields an empty vector.
///
/// # Errors
///
/// Same as [`lenient`].
pub fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        if !value.is_null() {
            tracing::debug!(kind = kind_of(&value), "expected array; substituting empty");
        }
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                tracing::debug!(%error, "dropping malformed sequence element");
                None
            }
        })
        .collect())
}

/// Decode an optional field; anything that does not decode becomes `None`.
///
/// # Errors
///
/// Same as [`lenient`].
pub fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Coerce an arbitrary JSON value into `T`, substituting the default.
pub fn coerce<T>(value: Value) -> T
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return T::default();
    }
    let kind = kind_of(&value);
    serde_json::from_value(value).unwrap_or_else(|error| {
        tracing::debug!(%error, kind, "field failed validation; substituting default");
        T::default()
    })
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient")]
        name: String,
        #[serde(default, deserialize_with = "lenient")]
        count: u32,
        #[serde(default, deserialize_with = "lenient_seq")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "lenient_opt")]
        limit: Option<u32>,
    }

    #[test]
    fn well_formed_fields_pass_through() {
        let probe: Probe = serde_json::from_value(json!({
            "name": "alpha",
            "count": 3,
            "tags": ["a", "b"],
            "limit": 5
        }))
        .unwrap();
        assert_eq!(probe.name, "alpha");
        assert_eq!(probe.count, 3);
        assert_eq!(probe.tags, vec!["a", "b"]);
        assert_eq!(probe.limit, Some(5));
    }

    #[test]
    fn mistyped_fields_fall_back() {
        let probe: Probe = serde_json::from_value(json!({
            "name": 42,
            "count": "many",
            "tags": "not-a-list",
            "limit": "five"
        }))
        .unwrap();
        assert_eq!(probe, Probe::default());
    }

    #[test]
    fn null_and_missing_fields_fall_back() {
        let probe: Probe = serde_json::from_value(json!({ "name": null })).unwrap();
        assert_eq!(probe, Probe::default());
    }

    #[test]
    fn sequence_drops_only_bad_elements() {
        let probe: Probe =
            serde_json::from_value(json!({ "tags": ["ok", 7, null, "fine"] })).unwrap();
        assert_eq!(probe.tags, vec!["ok", "fine"]);
    }

    #[test]
    fn negative_count_is_not_accepted_as_unsigned() {
        let probe: Probe = serde_json::from_value(json!({ "count": -1 })).unwrap();
        assert_eq!(probe.count, 0);
    }
}
