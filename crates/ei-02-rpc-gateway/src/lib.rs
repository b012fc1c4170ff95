#![allow(missing_docs)]

//! EI-02 RPC Gateway - JSON-RPC over HTTP for the log index.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    RPC GATEWAY (ei-02)                     │
//! ├───────────────────────────────────────────────────────────┤
//! │   HTTP POST (any path)                                     │
//! │        │                                                   │
//! │   Trace → Timeout → CatchPanic                             │
//! │        │                                                   │
//! │   drain check → method check → body read → decode          │
//! │        │                                                   │
//! │   Dispatcher: "eth_getLogs" → EthService::GetLogs          │
//! │        │                                                   │
//! └────────┼──────────────────────────────────────────────────┘
//!          ▼
//!   ei-01 LogQueryApi / ChainSyncApi
//! ```
//!
//! # Errors
//!
//! Transport errors (`-32600`, `-32601`, `-32603`) travel in the envelope's
//! `error` field. Parameter rejections from an operation are nested inside a
//! successful `result` as an application response with id `"000000"`.
//!
//! # Usage
//!
//! ```ignore
//! use ei_02_rpc_gateway::{build_router, serve, Dispatcher, DrainHandle, EthService};
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register(&EthService::new(query))?;
//! let dispatcher = Arc::new(Dispatcher::new(registry)?);
//!
//! let router = build_router(dispatcher, drain.clone(), &config);
//! serve(listener, router, shutdown).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod codec;
pub mod dispatch;
pub mod domain;
pub mod middleware;
pub mod rpc;
pub mod transport;

pub use codec::{decode_request, decode_responses, encode_request, encode_response};
pub use dispatch::{
    split_method, Dispatcher, MethodDescriptor, Operation, ParamKind, Service, ServiceRegistry,
};
pub use domain::{
    codes, AppResponse, CodecError, ConfigError, GatewayConfig, GatewayError, HttpConfig,
    LimitsConfig, RegistryError, Reply, RpcError, RpcRequest, RpcResponse, ServiceError,
    TimeoutConfig, APP_RESPONSE_ID, JSONRPC_VERSION,
};
pub use middleware::TimeoutLayer;
pub use rpc::{EthService, SYNC_SUCCESS};
pub use transport::{build_router, handle_rpc, serve, AppState, DrainHandle, DRAIN_MESSAGE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
