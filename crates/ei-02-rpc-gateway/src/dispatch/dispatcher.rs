//! Method routing.
//!
//! `eth_getLogs` is split on its single underscore; the part after it, with
//! the first character uppercased, names an operation of the primary
//! service. The prefix is not consulted.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::dispatch::registry::{Operation, ServiceRegistry};
use crate::domain::{RegistryError, Reply, RpcError, RpcRequest, RpcResponse};

/// Routes decoded requests to registered operations.
pub struct Dispatcher {
    service: String,
    methods: HashMap<String, Arc<dyn Operation>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service", &self.service)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Dispatcher {
    /// Freeze `registry`. The first registered service becomes the primary.
    pub fn new(registry: ServiceRegistry) -> Result<Self, RegistryError> {
        let primary = registry
            .into_services()
            .into_iter()
            .next()
            .ok_or(RegistryError::NoServices)?;

        Ok(Self {
            service: primary.name,
            methods: primary.methods,
        })
    }

    /// Name of the service requests are routed to.
    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Run one request to completion.
    pub async fn dispatch(&self, mut request: RpcRequest) -> RpcResponse {
        let id = request.id;

        let Some(name) = split_method(&request.method) else {
            debug!(method = %request.method, "Unroutable method name");
            return RpcResponse::failure(id, RpcError::method_not_found(request.method));
        };

        let Some(operation) = self.methods.get(&name) else {
            debug!(method = %request.method, operation = %name, "No such operation");
            return RpcResponse::failure(id, RpcError::method_not_found(request.method));
        };

        // The codec guarantees exactly one criteria object.
        let Some(params) = request.params.pop() else {
            return RpcResponse::failure(
                id,
                RpcError::invalid_request("params must hold exactly one element, got 0"),
            );
        };

        let mut reply = Reply::new();
        match operation.call(params, &mut reply).await {
            Ok(()) => RpcResponse::success(id, reply.into_value()),
            Err(e) => {
                warn!(method = %request.method, error = %e, "Operation failed");
                RpcResponse::failure(id, RpcError::internal_error(e.to_string()))
            }
        }
    }
}

/// Operation name for a wire method, `None` unless it has exactly one `_`.
pub fn split_method(method: &str) -> Option<String> {
    let mut parts = method.split('_');
    let (Some(_prefix), Some(suffix), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };

    let mut chars = suffix.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::registry::{MethodDescriptor, Service};
    use crate::domain::ServiceError;
    use async_trait::async_trait;
    use serde_json::json;
    use shared_types::FilterCriteria;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Operation for Echo {
        async fn call(&self, params: FilterCriteria, reply: &mut Reply) -> Result<(), ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            reply.set(&params.addresses.len())
        }
    }

    struct Failing;

    #[async_trait]
    impl Operation for Failing {
        async fn call(&self, _: FilterCriteria, _: &mut Reply) -> Result<(), ServiceError> {
            Err(ServiceError::Internal("disk on fire".into()))
        }
    }

    struct Silent;

    #[async_trait]
    impl Operation for Silent {
        async fn call(&self, _: FilterCriteria, _: &mut Reply) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    struct MockService {
        name: &'static str,
        echo: Arc<Echo>,
    }

    impl Service for MockService {
        fn name(&self) -> &str {
            self.name
        }

        fn methods(&self) -> Vec<MethodDescriptor> {
            vec![
                MethodDescriptor::criteria("GetLogs", self.echo.clone()),
                MethodDescriptor::criteria("Explode", Arc::new(Failing)),
                MethodDescriptor::criteria("Nothing", Arc::new(Silent)),
            ]
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<Echo>) {
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let mut registry = ServiceRegistry::new();
        registry
            .register(&MockService {
                name: "PublicApi",
                echo: echo.clone(),
            })
            .unwrap();
        (Dispatcher::new(registry).unwrap(), echo)
    }

    #[test]
    fn test_split_method() {
        assert_eq!(split_method("eth_getLogs").as_deref(), Some("GetLogs"));
        assert_eq!(split_method("anything_getLogs").as_deref(), Some("GetLogs"));
        assert_eq!(
            split_method("eth_syncBlockAndLogs").as_deref(),
            Some("SyncBlockAndLogs")
        );
        assert_eq!(split_method("getLogs"), None);
        assert_eq!(split_method("a_b_c"), None);
        assert_eq!(split_method("eth_"), None);
        assert_eq!(split_method(""), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_split_requires_single_underscore(
            prefix in "[a-z]{0,6}",
            suffix in "[a-zA-Z]{1,12}",
            extra in "[a-z]{0,4}",
        ) {
            let routed = split_method(&format!("{prefix}_{suffix}"));
            let expected: String = suffix[..1].to_uppercase() + &suffix[1..];
            proptest::prop_assert_eq!(routed, Some(expected));

            let twice = format!("{prefix}_{suffix}_{extra}");
            proptest::prop_assert_eq!(split_method(&twice), None);
            proptest::prop_assert_eq!(split_method(&format!("{prefix}{suffix}")), None);
        }
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(matches!(
            Dispatcher::new(ServiceRegistry::new()),
            Err(RegistryError::NoServices)
        ));
    }

    #[tokio::test]
    async fn test_routes_to_operation() {
        let (dispatcher, echo) = dispatcher();
        assert_eq!(dispatcher.service_name(), "PublicApi");

        let criteria = FilterCriteria::new().with_addresses([Default::default()]);
        let response = dispatcher
            .dispatch(RpcRequest::new(9, "eth_getLogs", criteria))
            .await;

        assert_eq!(response.id, 9);
        assert_eq!(response.result, Some(json!(1)));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1, "handler invoked once");
    }

    #[tokio::test]
    async fn test_unknown_methods() {
        let (dispatcher, echo) = dispatcher();

        for method in ["getLogs", "a_b_c", "eth_missing", "eth_GetLogs_x"] {
            let response = dispatcher
                .dispatch(RpcRequest::new(4, method, FilterCriteria::new()))
                .await;
            let error = response.error.expect("method-not-found error");
            assert_eq!(error.code, -32601, "{method}");
            assert_eq!(error.data.as_deref(), Some(method));
            assert_eq!(response.id, 4);
        }
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0, "no handler invoked");
    }

    #[tokio::test]
    async fn test_operation_failure_is_internal_error() {
        let (dispatcher, _) = dispatcher();
        let response = dispatcher
            .dispatch(RpcRequest::new(2, "eth_explode", FilterCriteria::new()))
            .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert_eq!(error.data.as_deref(), Some("disk on fire"));
        assert!(response.result.is_none());
    }

    #[tokio::test]
    async fn test_unset_reply_is_null_result() {
        let (dispatcher, _) = dispatcher();
        let response = dispatcher
            .dispatch(RpcRequest::new(1, "eth_nothing", FilterCriteria::new()))
            .await;
        assert_eq!(response.result, Some(serde_json::Value::Null));
        assert!(!response.is_error());
    }
}
