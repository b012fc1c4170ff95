//! Domain types for the gateway: wire envelopes, errors and configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigError, GatewayConfig, HttpConfig, LimitsConfig, TimeoutConfig};
pub use error::{codes, CodecError, GatewayError, RegistryError, RpcError, ServiceError};
pub use types::{AppResponse, Reply, RpcRequest, RpcResponse, APP_RESPONSE_ID, JSONRPC_VERSION};
