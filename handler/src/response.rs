//! Operation results and envelope formatting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::error;

use crate::event::Envelope;

/// Status code carried by successful results.
pub const STATUS_OK: &str = "200";

/// Status code carried by failures.
pub const STATUS_BAD_REQUEST: &str = "400";

/// Body used if a result cannot be serialized.
const UNSERIALIZABLE_BODY: &str =
    r#"{"success":false,"errorMessage":"system_exception","statusCode":"400"}"#;

/// Uniform result of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub status_code: String,
}

impl OperationResult {
    /// A successful result with status `"200"`.
    pub fn success(result: impl Into<Value>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error_message: None,
            status_code: STATUS_OK.to_string(),
        }
    }

    /// A failed result with status `"400"`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error_message: Some(message.into()),
            status_code: STATUS_BAD_REQUEST.to_string(),
        }
    }
}

/// Static headers allowing unrestricted cross-origin access.
pub fn cors_headers() -> BTreeMap<String, String> {
    [
        ("Access-Control-Allow-Origin", "*"),
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Methods", "*"),
        ("Access-Control-Allow-Headers", "Content-Type"),
        ("Access-Control-Allow-Credentials", "*"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Build the envelope for an operation outcome.
///
/// `Err` is a routing-level failure: the status is always `"400"` whatever
/// the failure itself says. `Ok` uses the result's own status code, so an
/// operation can return a failure-shaped result through the `Ok` path.
pub fn format(outcome: Result<OperationResult, OperationResult>) -> Envelope {
    match outcome {
        Err(failure) => Envelope {
            status_code: STATUS_BAD_REQUEST.to_string(),
            body: serialize(&failure),
            headers: cors_headers(),
        },
        Ok(mut result) => {
            if let Some(value) = result.result.as_mut() {
                normalize_numbers(value);
            }
            Envelope {
                status_code: result.status_code.clone(),
                body: serialize(&result),
                headers: cors_headers(),
            }
        }
    }
}

fn serialize(result: &OperationResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        error!("error=serialize_result: {e}");
        UNSERIALIZABLE_BODY.to_string()
    })
}

/// Numeric serialization policy: a finite float with no fractional part is
/// written as an integer, anything else is left alone.
pub fn normalize_number(number: &Number) -> Number {
    match number.as_f64() {
        Some(f) if number.is_f64() && f.is_finite() && f.fract() == 0.0 => {
            // Only whole values inside the i64 range convert exactly.
            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Number::from(f as i64)
            } else {
                number.clone()
            }
        }
        _ => number.clone(),
    }
}

/// Apply [`normalize_number`] to every number in `value`.
pub fn normalize_numbers(value: &mut Value) {
    match value {
        Value::Number(number) => *number = normalize_number(number),
        Value::Array(items) => items.iter_mut().for_each(normalize_numbers),
        Value::Object(map) => map.values_mut().for_each(normalize_numbers),
        Value::Null | Value::Bool(_) | Value::String(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(value: Value) -> String {
        let Value::Number(number) = value else {
            panic!("not a number");
        };
        Value::Number(normalize_number(&number)).to_string()
    }

    #[test]
    fn test_whole_float_becomes_integer() {
        assert_eq!(render(json!(4.0)), "4");
        assert_eq!(render(json!(-12.0)), "-12");
    }

    #[test]
    fn test_fractional_float_kept() {
        assert_eq!(render(json!(4.5)), "4.5");
        assert_eq!(render(json!(0.6)), "0.6");
    }

    #[test]
    fn test_integers_untouched() {
        assert_eq!(render(json!(7)), "7");
        assert_eq!(render(json!(u64::MAX)), u64::MAX.to_string());
    }

    #[test]
    fn test_huge_whole_float_kept_as_float() {
        assert_eq!(render(json!(1e300)), "1e300");
    }

    #[test]
    fn test_nested_numbers_normalized() {
        let mut value = json!({"scores": [1.0, 2.5], "meta": {"count": 3.0}});
        normalize_numbers(&mut value);
        assert_eq!(value, json!({"scores": [1, 2.5], "meta": {"count": 3}}));
    }

    #[test]
    fn test_error_status_is_always_400() {
        let mut failure = OperationResult::failure("api_not_supported");
        failure.status_code = "500".to_string();

        let envelope = format(Err(failure));
        assert_eq!(envelope.status_code, "400");
        assert_eq!(
            envelope.body,
            r#"{"success":false,"errorMessage":"api_not_supported","statusCode":"500"}"#
        );
    }

    #[test]
    fn test_result_uses_own_status() {
        let envelope = format(Ok(OperationResult::failure("error deleting index. gone")));
        assert_eq!(envelope.status_code, "400");

        let envelope = format(Ok(OperationResult::success("Index deleted successfully")));
        assert_eq!(envelope.status_code, "200");
        assert_eq!(
            envelope.body,
            r#"{"success":true,"result":"Index deleted successfully","statusCode":"200"}"#
        );
    }

    #[test]
    fn test_result_body_normalizes_numbers() {
        let envelope = format(Ok(OperationResult::success(json!({"total": 4.0, "ratio": 4.5}))));
        let body: Value = serde_json::from_str(&envelope.body).unwrap();
        assert_eq!(body["result"]["total"].to_string(), "4");
        assert_eq!(body["result"]["ratio"].to_string(), "4.5");
    }

    #[test]
    fn test_cors_headers() {
        let headers = format(Ok(OperationResult::success("ok"))).headers;
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers.len(), 5);
    }
}
