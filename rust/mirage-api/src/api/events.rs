//! Server-sent event stream of simulator changes.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::AppState;

/// Create the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", get(event_stream))
}

/// Stream every simulator event as it happens.
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.simulator.subscribe());

    let sse_stream = stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok::<_, Infallible>(
                    Event::default().event(event.event_type()).data(data),
                ))
            }
            Err(e) => {
                tracing::debug!("Event stream lagged: {}", e);
                None
            }
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
