//! Adapters Layer
//!
//! Concrete implementations of the outbound ports.

pub mod memory_store;
pub mod upstream;

pub use memory_store::InMemoryLogStore;
pub use upstream::JsonRpcUpstream;
