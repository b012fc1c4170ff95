//! Ports layer: trait seams between the engine and the outside world.

pub mod inbound;
pub mod outbound;

pub use inbound::{ChainSyncApi, LogQueryApi, SyncReport};
pub use outbound::{LogSink, LogStore, UpstreamChain};
