//! Service registration and method dispatch.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{split_method, Dispatcher};
pub use registry::{MethodDescriptor, Operation, ParamKind, Service, ServiceRegistry};
