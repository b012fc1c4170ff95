//! HTTP transport.
//!
//! Every path accepts the same JSON-RPC request. The handler checks, in
//! order: drain state, HTTP method, body read, request decode. Only then is
//! the request dispatched.
//!
//! ```text
//! draining            -> 401 Internal error "Node channel closed"
//! not POST            -> 200 Method not found "method not allowed: GET"
//! unreadable body     -> 200 Internal error
//! undecodable body    -> 200 Invalid Request
//! otherwise           -> 200 dispatcher response
//! ```

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::codec::{decode_request, encode_response};
use crate::dispatch::Dispatcher;
use crate::domain::{GatewayConfig, GatewayError, RpcError, RpcResponse};
use crate::middleware::TimeoutLayer;

/// Data returned to every request once draining has started.
pub const DRAIN_MESSAGE: &str = "Node channel closed";

/// Shutdown flag shared by the transport and the process.
///
/// Once raised it stays raised.
#[derive(Clone, Debug)]
pub struct DrainHandle {
    state: Arc<watch::Sender<bool>>,
}

impl Default for DrainHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl DrainHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Raise the flag. Returns true if this call raised it.
    pub fn drain(&self) -> bool {
        !self.state.send_replace(true)
    }

    pub fn is_draining(&self) -> bool {
        *self.state.borrow()
    }

    /// Receiver notified when the flag is raised.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub drain: DrainHandle,
    pub max_body_size: usize,
}

/// Build the router with its middleware stack.
pub fn build_router(
    dispatcher: Arc<Dispatcher>,
    drain: DrainHandle,
    config: &GatewayConfig,
) -> Router {
    let state = AppState {
        dispatcher,
        drain,
        max_body_size: config.limits.max_body_size,
    };

    Router::new()
        .fallback(handle_rpc)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(config.timeouts.request))
        .layer(TraceLayer::new_for_http())
}

/// JSON-RPC handler for every path.
pub async fn handle_rpc(State(state): State<AppState>, request: Request) -> Response {
    if state.drain.is_draining() {
        debug!("Rejecting request while draining");
        return json_response(
            StatusCode::UNAUTHORIZED,
            &RpcResponse::failure(0, RpcError::internal_error(DRAIN_MESSAGE)),
        );
    }

    if request.method() != Method::POST {
        let error = RpcError::method_not_found(format!("method not allowed: {}", request.method()));
        return json_response(StatusCode::OK, &RpcResponse::failure(0, error));
    }

    let body: Bytes = match axum::body::to_bytes(request.into_body(), state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "Failed to read request body");
            return json_response(
                StatusCode::OK,
                &RpcResponse::failure(0, RpcError::internal_error(e.to_string())),
            );
        }
    };

    let rpc_request = match decode_request(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Failed to decode request");
            return json_response(
                StatusCode::OK,
                &RpcResponse::failure(0, RpcError::invalid_request(e.to_string())),
            );
        }
    };

    let response = state.dispatcher.dispatch(rpc_request).await;
    json_response(StatusCode::OK, &response)
}

fn json_response(status: StatusCode, response: &RpcResponse) -> Response {
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        encode_response(response),
    )
        .into_response()
}

/// A panicking handler answers `Internal error` instead of dropping the
/// connection.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    json_response(
        StatusCode::OK,
        &RpcResponse::failure(0, RpcError::internal_error(detail)),
    )
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), GatewayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| GatewayError::Bind(e.to_string()))?;
    info!(%addr, "JSON-RPC server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::Serve(e.to_string()))?;

    info!("JSON-RPC server stopped");
    Ok(())
}
