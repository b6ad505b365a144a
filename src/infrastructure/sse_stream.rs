// Server-sent event streaming utilities
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Turn every message from `rx` into one named SSE event carrying JSON
pub fn sse_from_receiver<T>(
    mut rx: mpsc::Receiver<T>,
    event_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + 'static,
{
    let stream = async_stream::stream! {
        while let Some(msg) = rx.recv().await {
            match Event::default().event(event_name).json_data(&msg) {
                Ok(event) => yield Ok::<Event, Infallible>(event),
                Err(e) => tracing::warn!("Dropping unserializable {} event: {}", event_name, e),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
