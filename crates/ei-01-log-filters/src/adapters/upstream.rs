//! JSON-RPC upstream node client
//!
//! Implements [`UpstreamChain`] over `eth_getBlockByNumber` and `eth_getLogs`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::encoding::{format_quantity, quantity};
use shared_types::{BlockBloomRecord, Bloom, Hash, LogRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::DataError;
use crate::ports::UpstreamChain;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Header fields needed to index a block.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    #[serde(with = "quantity")]
    number: u64,
    hash: Hash,
    logs_bloom: Bloom,
}

/// Upstream chain node reached over HTTP JSON-RPC.
pub struct JsonRpcUpstream {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl JsonRpcUpstream {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.rpc_url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, DataError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        debug!(method, id, "Calling upstream");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::Timeout
                } else {
                    DataError::ConnectionError(e.to_string())
                }
            })?;

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| DataError::ParseError(e.to_string()))?;
        unwrap_response(method, body)
    }
}

fn unwrap_response(method: &str, body: JsonRpcResponse) -> Result<Value, DataError> {
    if let Some(error) = body.error {
        return Err(DataError::Upstream {
            code: error.code,
            message: error.message,
        });
    }
    match body.result {
        None | Some(Value::Null) => Err(DataError::QueryError(format!(
            "{method} returned no result"
        ))),
        Some(result) => Ok(result),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, DataError> {
    serde_json::from_value(value).map_err(|e| DataError::ParseError(e.to_string()))
}

fn parse_block_header(value: Value) -> Result<BlockBloomRecord, DataError> {
    let header: BlockHeader = decode(value)?;
    Ok(BlockBloomRecord {
        block_number: header.number,
        block_hash: header.hash,
        bloom: header.logs_bloom,
    })
}

#[async_trait]
impl UpstreamChain for JsonRpcUpstream {
    async fn block_bloom(&self, height: u64) -> Result<BlockBloomRecord, DataError> {
        let result = self
            .call(
                "eth_getBlockByNumber",
                json!([format_quantity(height), false]),
            )
            .await?;
        parse_block_header(result)
    }

    async fn logs_in_range(&self, from: u64, to: u64) -> Result<Vec<LogRecord>, DataError> {
        let result = self
            .call(
                "eth_getLogs",
                json!([{
                    "fromBlock": format_quantity(from),
                    "toBlock": format_quantity(to),
                }]),
            )
            .await?;
        decode(result)
    }
}
