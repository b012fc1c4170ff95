//! Service registry
//!
//! A service is a named, fixed set of operations. Each operation declares its
//! input shape, and [`ServiceRegistry::register`] checks every declaration
//! once at startup. An unsuitable operation fails the whole registration.
//!
//! The registry is built by a single writer and then frozen into a
//! [`Dispatcher`](crate::dispatch::Dispatcher), so lookups need no locking.

use async_trait::async_trait;
use shared_types::FilterCriteria;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{RegistryError, Reply, ServiceError};

/// Input shapes an operation may declare.
///
/// The codec only decodes criteria objects, so that is the one shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// `eth_getLogs`-style criteria object
    FilterCriteria,
}

/// One callable operation.
///
/// Returning `Err` reports a transport `Internal error`. Input rejections
/// are written into `reply` as an application error and return `Ok`.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn call(&self, params: FilterCriteria, reply: &mut Reply) -> Result<(), ServiceError>;
}

/// Declaration of one operation of a service.
#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub inputs: Vec<ParamKind>,
    pub handler: Arc<dyn Operation>,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<ParamKind>,
        handler: Arc<dyn Operation>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            handler,
        }
    }

    /// Operation taking a single criteria object.
    pub fn criteria(name: impl Into<String>, handler: Arc<dyn Operation>) -> Self {
        Self::new(name, vec![ParamKind::FilterCriteria], handler)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// An object exposing operations over RPC.
pub trait Service: Send + Sync {
    /// Registration name, unique per registry.
    fn name(&self) -> &str;

    fn methods(&self) -> Vec<MethodDescriptor>;
}

pub(crate) struct RegisteredService {
    pub(crate) name: String,
    pub(crate) methods: HashMap<String, Arc<dyn Operation>>,
}

/// Registered services, in registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<RegisteredService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a service.
    pub fn register(&mut self, service: &dyn Service) -> Result<(), RegistryError> {
        let name = service.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !is_exported(name) {
            return Err(RegistryError::NotExported(name.to_string()));
        }
        if self.services.iter().any(|s| s.name == name) {
            return Err(RegistryError::DuplicateService(name.to_string()));
        }

        let descriptors = service.methods();
        if descriptors.is_empty() {
            return Err(RegistryError::NoMethods(name.to_string()));
        }

        let mut methods = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            check_method(name, &descriptor)?;
            if methods.contains_key(&descriptor.name) {
                return Err(unsuitable(name, &descriptor.name, "defined twice"));
            }
            methods.insert(descriptor.name, descriptor.handler);
        }

        self.services.push(RegisteredService {
            name: name.to_string(),
            methods,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    /// Sorted operation names of `service`.
    pub fn method_names(&self, service: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .services
            .iter()
            .find(|s| s.name == service)
            .map(|s| s.methods.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub(crate) fn into_services(self) -> Vec<RegisteredService> {
        self.services
    }
}

fn check_method(service: &str, descriptor: &MethodDescriptor) -> Result<(), RegistryError> {
    let method = descriptor.name.as_str();
    if !is_exported(method) {
        return Err(unsuitable(service, method, "method is not exported"));
    }
    if method.contains('_') {
        return Err(unsuitable(
            service,
            method,
            "name contains '_' and could never be dispatched",
        ));
    }
    if descriptor.inputs.len() != 1 {
        return Err(unsuitable(
            service,
            method,
            &format!(
                "has {} input parameters; needs exactly one",
                descriptor.inputs.len()
            ),
        ));
    }
    Ok(())
}

fn unsuitable(service: &str, method: &str, reason: &str) -> RegistryError {
    RegistryError::UnsuitableMethod {
        service: service.to_string(),
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
