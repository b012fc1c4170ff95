//! JSON codec for request and response envelopes.
//!
//! The server side decodes requests and encodes responses. The client side
//! (`encode_request`, `decode_responses`) is used by tests and tooling.

use serde_json::Value;
use shared_types::FilterCriteria;

use crate::domain::{CodecError, RpcRequest, RpcResponse};

/// Written when a response cannot be serialized.
const ENCODE_FAILURE: &[u8] = br#"{"id":0,"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error","data":"failed to encode response"}}"#;

/// Decode one request. `params` must hold exactly one criteria object.
pub fn decode_request(bytes: &[u8]) -> Result<RpcRequest, CodecError> {
    let request: RpcRequest = serde_json::from_slice(bytes)?;
    if request.params.len() != 1 {
        return Err(CodecError::Arity(request.params.len()));
    }
    Ok(request)
}

pub fn encode_response(response: &RpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode response");
        ENCODE_FAILURE.to_vec()
    })
}

pub fn encode_request(
    id: i64,
    method: &str,
    criteria: FilterCriteria,
) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(&RpcRequest::new(id, method, criteria))?)
}

/// Decode a response body holding either one response or an array of them.
pub fn decode_responses(bytes: &[u8]) -> Result<Vec<RpcResponse>, CodecError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(CodecError::from))
            .collect(),
        single => Ok(vec![serde_json::from_value(single)?]),
    }
}
