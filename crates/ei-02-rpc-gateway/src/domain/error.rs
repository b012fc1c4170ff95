//! Gateway error types with JSON-RPC 2.0 error codes.
//!
//! Two layers share the same error object shape:
//!
//! - transport errors travel in the envelope's `error` field
//! - application errors are nested inside a successful envelope's `result`

use ei_01_log_filters::{DataError, QueryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC error codes used by the gateway
pub mod codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Application-level parameter rejection
    pub const INVALID_PARAMS: i64 = -32000;
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i64, message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data.into()),
        }
    }

    /// Malformed body or wrong parameter arity
    pub fn invalid_request(data: impl Into<String>) -> Self {
        Self::with_data(codes::INVALID_REQUEST, "Invalid Request", data)
    }

    /// Unroutable method name or non-POST request
    pub fn method_not_found(data: impl Into<String>) -> Self {
        Self::with_data(codes::METHOD_NOT_FOUND, "Method not found", data)
    }

    /// Handler fault, storage fault, drain state or timeout
    pub fn internal_error(data: impl Into<String>) -> Self {
        Self::with_data(codes::INTERNAL_ERROR, "Internal error", data)
    }

    /// Application-level validation failure
    pub fn invalid_params(data: impl Into<String>) -> Self {
        Self::with_data(codes::INVALID_PARAMS, "Invalid params", data)
    }

    /// Application-level system failure (upstream or storage)
    pub fn system_error(data: impl Into<String>) -> Self {
        Self::internal_error(data)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "[{}] {}: {}", self.code, self.message, data),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for RpcError {}

/// Error returned by an operation; reported as a transport `Internal error`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("failed to encode reply: {0}")]
    Encode(String),

    #[error("{0}")]
    Internal(String),
}

/// Rejections raised while registering a service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("rpc.Register: no service name")]
    EmptyName,

    #[error("rpc.Register: type {0} is not exported")]
    NotExported(String),

    #[error("rpc: service already defined: {0}")]
    DuplicateService(String),

    #[error("rpc.Register: service {0} exposes no methods")]
    NoMethods(String),

    #[error("rpc.Register: method {method:?} of {service}: {reason}")]
    UnsuitableMethod {
        service: String,
        method: String,
        reason: String,
    },

    #[error("rpc: no service registered")]
    NoServices,
}

/// Codec failures
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("params must hold exactly one element, got {0}")]
    Arity(usize),
}

/// Gateway-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("server error: {0}")]
    Serve(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
