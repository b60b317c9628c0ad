//! Server-Sent Events stream of run state.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use flowloop::core::types::StateEvent;
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::state::AppState;

fn state_event(event: &StateEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event("state").data(json)),
        Err(err) => {
            warn!(error = %err, "failed to serialize state event");
            None
        }
    }
}

/// SSE endpoint handler.
///
/// Sends `connected`, then the latest snapshot (if any), then every published
/// state event. A lagging client skips events rather than slowing the run.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.controller.subscribe();
    let snapshot = state.controller.snapshot();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        if let Some(event) = snapshot.as_ref().and_then(state_event) {
            yield Ok(event);
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(sse) = state_event(&event) {
                        yield Ok(sse);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn stream_starts_with_connected_then_carries_run_events() {
        let state = AppState::new();
        let app = Router::new()
            .route("/events", get(events_handler))
            .with_state(state.clone());

        let response = app
            .oneshot(Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let mut body = response.into_body();
        let mut seen = String::new();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        seen.push_str(&String::from_utf8_lossy(&first));
        assert!(seen.starts_with("event: connected"), "{seen}");

        state
            .controller
            .start_run(flowloop::core::types::RunConfig::default())
            .unwrap();

        let read = async {
            while !seen.contains(r#""phase":"succeeded""#) {
                let frame = body.frame().await.unwrap().unwrap();
                if let Ok(data) = frame.into_data() {
                    seen.push_str(&String::from_utf8_lossy(&data));
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), read)
            .await
            .expect("terminal state event");
        assert!(seen.contains("event: state"));
    }
}
