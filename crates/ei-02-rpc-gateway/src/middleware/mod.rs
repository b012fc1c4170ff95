//! HTTP middleware.

pub mod timeout;

pub use timeout::{timeout_response, TimeoutLayer, TimeoutService};
