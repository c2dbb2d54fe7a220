// HTTP delivery of the live feed

pub mod stream;
pub mod websocket;

use crate::publisher::{Publisher, SinkHandle};
use crate::store::StateStore;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StateStore>,
    pub publisher: Arc<Publisher>,
}

/// Create the router serving the feed endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/state.json", get(current_state))
        .route("/stream.sse", get(stream::sse_handler))
        .route("/stream.ws", get(websocket::ws_handler))
        .fallback(fallback)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> &'static str {
    "liftstream: live elevator and escalator status. Subscribe at /stream.sse or /stream.ws"
}

/// GET /state.json - last known state of every facility
async fn current_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.snapshot())
}

async fn fallback(method: Method) -> Response {
    if method == Method::GET || method == Method::HEAD {
        (StatusCode::NOT_FOUND, "404").into_response()
    } else {
        (StatusCode::METHOD_NOT_ALLOWED, "405").into_response()
    }
}

/// Removes a connection's sink from the publisher when the connection ends
pub(crate) struct SubscriptionGuard {
    publisher: Arc<Publisher>,
    handle: SinkHandle,
}

impl SubscriptionGuard {
    pub(crate) fn new(publisher: Arc<Publisher>, handle: SinkHandle) -> Self {
        Self { publisher, handle }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.publisher.unsubscribe(self.handle);
    }
}
