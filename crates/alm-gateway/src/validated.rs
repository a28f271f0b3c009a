//! Schema-validating fetch.
//!
//! Response types declare a fallback for every field (see
//! `alm_core::lenient`), so a partially malformed payload still produces a
//! fully-typed value. Only gateway-level failures (network, auth, non-2xx)
//! surface as errors.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{Gateway, RequestOptions};
use crate::error::ApiError;

impl Gateway {
    /// Fetch `path` and coerce the body into `T`, substituting defaults for
    /// anything malformed. `context` labels the call in logs.
    ///
    /// # Errors
    ///
    /// Only gateway failures; see [`Gateway::request_value`].
    pub async fn fetch_validated<T>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
        context: &str,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let value = self.request_value(method, path, options).await?;
        Ok(validate(value, context))
    }
}

/// Coerce an arbitrary JSON document into `T`.
///
/// A document that is not an object (or that `T` still rejects) yields
/// `T::default()` and a warning naming `context`.
pub fn validate<T>(value: Value, context: &str) -> T
where
    T: DeserializeOwned + Default,
{
    if !value.is_object() {
        tracing::warn!(context, "response body is not an object; using defaults");
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_else(|error| {
        tracing::warn!(context, %error, "response failed validation; using defaults");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alm_core::{Entitlement, ReportArtifact};
    use serde_json::json;

    #[test]
    fn non_object_body_yields_default() {
        let ent: Entitlement = validate(json!([1, 2, 3]), "entitlements");
        assert_eq!(ent, Entitlement::default());

        let ent: Entitlement = validate(Value::Null, "entitlements");
        assert_eq!(ent, Entitlement::default());
    }

    #[test]
    fn partial_report_still_decodes() {
        let artifact: ReportArtifact = validate(
            json!({
                "date": "2026-03-02",
                "report": {
                    "summary": 12,
                    "tomorrow_routine": [{ "time": "08:00", "title": "Run" }, "garbage"]
                }
            }),
            "analyze",
        );
        assert_eq!(artifact.date, "2026-03-02");
        assert_eq!(artifact.report.summary, "");
        assert_eq!(artifact.report.tomorrow_routine.len(), 1);
        assert_eq!(artifact.report.tomorrow_routine[0].goal, "");
    }
}
