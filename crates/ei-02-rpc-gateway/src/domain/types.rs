//! Wire envelopes.
//!
//! ```text
//! request:  {"id": 1, "method": "eth_getLogs", "params": [<criteria>], "jsonrpc": "2.0"}
//! response: {"id": 1, "jsonrpc": "2.0", "result": ...}
//!           {"id": 1, "jsonrpc": "2.0", "error": {"code", "message", "data"}}
//! ```
//!
//! A handler that rejects its input still answers with a successful envelope
//! whose `result` is an [`AppResponse`] carrying the error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::FilterCriteria;

use crate::domain::error::{RpcError, ServiceError};

pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed id of nested application responses.
pub const APP_RESPONSE_ID: &str = "000000";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: i64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<FilterCriteria>,
    #[serde(default = "default_version")]
    pub jsonrpc: String,
}

impl RpcRequest {
    pub fn new(id: i64, method: impl Into<String>, criteria: FilterCriteria) -> Self {
        Self {
            id,
            method: method.into(),
            params: vec![criteria],
            jsonrpc: default_version(),
        }
    }
}

/// JSON-RPC response: exactly one of `error` and `result` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl RpcResponse {
    pub fn success(id: i64, result: Value) -> Self {
        Self {
            id,
            jsonrpc: default_version(),
            error: None,
            result: Some(result),
        }
    }

    /// Transport-level error. Errors raised before a request was decoded
    /// carry id 0.
    pub fn failure(id: i64, error: RpcError) -> Self {
        Self {
            id,
            jsonrpc: default_version(),
            error: Some(error),
            result: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The application error nested in a successful result, if any.
    pub fn app_error(&self) -> Option<RpcError> {
        let result = self.result.as_ref()?;
        let app: AppResponse = serde_json::from_value(result.clone()).ok()?;
        app.error
    }
}

/// Application-level response nested inside an RPC result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppResponse {
    pub id: String,
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl AppResponse {
    pub fn failure(error: RpcError) -> Self {
        Self {
            id: APP_RESPONSE_ID.to_string(),
            jsonrpc: default_version(),
            error: Some(error),
            result: None,
        }
    }
}

/// Output slot handed to an operation.
///
/// Left empty, the response result is `null`.
#[derive(Debug, Default)]
pub struct Reply {
    value: Option<Value>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ServiceError> {
        let value =
            serde_json::to_value(value).map_err(|e| ServiceError::Encode(e.to_string()))?;
        self.value = Some(value);
        Ok(())
    }

    /// Answer with a nested application error.
    pub fn set_app_error(&mut self, error: RpcError) {
        // AppResponse always serializes.
        self.value = serde_json::to_value(AppResponse::failure(error)).ok();
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_value(self) -> Value {
        self.value.unwrap_or(Value::Null)
    }
}
