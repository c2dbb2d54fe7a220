use super::{AppState, SubscriptionGuard};
use crate::publisher::Subscription;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// GET /stream.ws - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let subscription = state.publisher.subscribe();
    let _guard = SubscriptionGuard::new(Arc::clone(&state.publisher), subscription.handle());

    info!(
        subscribers = state.publisher.subscriber_count(),
        "WebSocket client connected"
    );

    forward(socket, subscription).await;

    info!("WebSocket connection closed");
}

/// Push every published message to the client; client input is ignored
async fn forward(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Text, binary and pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            outgoing = subscription.recv() => {
                match outgoing {
                    Some(message) => {
                        if let Err(e) = socket.send(Message::Text(message.to_string())).await {
                            warn!(error = %e, "Failed to send update");
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
