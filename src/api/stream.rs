use super::{AppState, SubscriptionGuard};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

/// GET /stream.sse - one `data:` event per changed record
pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.publisher.subscribe();
    let guard = SubscriptionGuard::new(Arc::clone(&state.publisher), subscription.handle());

    info!(
        subscribers = state.publisher.subscriber_count(),
        "SSE client connected"
    );

    // The guard lives as long as the stream; hyper drops it on disconnect
    let stream = ReceiverStream::new(subscription.into_receiver()).map(move |message| {
        let _ = &guard;
        Ok::<_, Infallible>(Event::default().data(&*message))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
