//! JSON-RPC 2.0 envelope types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error code the server uses to signal an expired session.
pub const SESSION_EXPIRED_CODE: i64 = 100;

/// Outbound `call` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Map<String, Value>,
    pub id: u64,
}

impl RpcRequest {
    pub fn call(params: Map<String, Value>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "call".to_string(),
            params,
            id,
        }
    }
}

/// Error object of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorPayload {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorPayload {
    pub fn is_session_expired(&self) -> bool {
        self.code == SESSION_EXPIRED_CODE
    }
}

impl fmt::Display for RpcErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Inbound response body. Exactly one of `result` and `error` is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorPayload>,
}

impl RpcResponse {
    /// Split into the result or the error payload. A response with neither
    /// yields `Ok(Value::Null)`, matching a `None` return from the server.
    pub fn into_result(self) -> Result<Value, RpcErrorPayload> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_envelope_serializes_jsonrpc_fields() {
        let request = RpcRequest::call(Map::new(), 42);
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({"jsonrpc": "2.0", "method": "call", "params": {}, "id": 42})
        );
    }

    #[test]
    fn response_with_error_splits_into_payload() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 100, "message": "Odoo Session Expired", "data": {"name": "SessionExpiredException"}}
        }))
        .expect("deserialize");

        let error = response.into_result().expect_err("error payload");
        assert!(error.is_session_expired());
        assert_eq!(error.to_string(), "Odoo Session Expired (code 100)");
    }

    #[test]
    fn response_without_result_is_null() {
        let response: RpcResponse = serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).expect("deserialize");
        assert_eq!(response.into_result(), Ok(Value::Null));
    }
}
