//! Uniform `{statusCode, responseBody}` view over API responses.
//!
//! Action endpoints (apply, cancel, discard, deletes) usually answer 202 or
//! 204 with no body. Requests for those ask the transport for the full
//! envelope, which is flattened here.

use serde::Serialize;
use serde_json::{json, Value};

/// Status assumed when the response carries none.
pub const DEFAULT_STATUS: u16 = 202;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub status_code: u16,
    /// `null` when the response had no body.
    pub response_body: Value,
}

/// Prefer `statusCode`, then `status`, else [`DEFAULT_STATUS`]. The body is
/// the envelope's `body` field when present, else `null`.
pub fn normalize(response: Option<&Value>) -> OperationResult {
    let status_of = |key: &str| {
        response
            .and_then(|r| r.get(key))
            .and_then(Value::as_u64)
            .and_then(|n| u16::try_from(n).ok())
    };
    let status_code = status_of("statusCode")
        .or_else(|| status_of("status"))
        .unwrap_or(DEFAULT_STATUS);

    let response_body = response
        .and_then(Value::as_object)
        .and_then(|obj| obj.get("body"))
        .cloned()
        .unwrap_or(Value::Null);

    OperationResult {
        status_code,
        response_body,
    }
}

/// Output record for body-less actions: `{<id_key>: id, action, statusCode, response}`.
pub fn action_record(id_key: &str, id: &str, action: &str, response: &Value) -> Value {
    let result = normalize(Some(response));
    json!({
        id_key: id,
        "action": action,
        "statusCode": result.status_code,
        "response": result.response_body,
    })
}
