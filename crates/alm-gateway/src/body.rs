//! Error body normalization.
//!
//! The API answers failures with one of:
//! - flat `{ "message": ..., "hint"?: ..., "code"?: ... }`
//! - nested `{ "detail": "text" }`
//! - nested `{ "detail": { "message": ..., "hint"?: ..., "code"?: ... } }`
//!
//! All three collapse into one [`ErrorBody`]. Anything else becomes a generic
//! message that still names the HTTP status.

use serde_json::{Map, Value};

use crate::error::ErrorBody;

/// Parse a non-2xx body. `header_reference` is the `x-request-id` header, if any.
#[must_use]
pub fn parse_error_body(status: u16, text: &str, header_reference: Option<&str>) -> ErrorBody {
    let mut body = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => from_object(&map),
        _ => ErrorBody::default(),
    };

    if body.message.trim().is_empty() {
        body.message = generic_message(status);
    }
    if body.reference_id.is_none() {
        body.reference_id = header_reference
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }
    body
}

fn from_object(map: &Map<String, Value>) -> ErrorBody {
    match map.get("detail") {
        Some(Value::String(detail)) => ErrorBody {
            message: detail.clone(),
            reference_id: reference(map),
            ..Default::default()
        },
        Some(Value::Object(detail)) => {
            let mut body = flat(detail);
            if body.reference_id.is_none() {
                body.reference_id = reference(map);
            }
            body
        }
        _ => flat(map),
    }
}

fn flat(map: &Map<String, Value>) -> ErrorBody {
    ErrorBody {
        message: string(map, "message").unwrap_or_default(),
        hint: string(map, "hint"),
        code: string(map, "code"),
        reference_id: reference(map),
    }
}

fn reference(map: &Map<String, Value>) -> Option<String> {
    string(map, "reference_id").or_else(|| string(map, "request_id"))
}

fn string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn generic_message(status: u16) -> String {
    format!("request failed with status {status}")
}
