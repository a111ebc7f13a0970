use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::warn;

use hindsight_slack::{EventCallback, EventDispatcher};

#[derive(Clone)]
pub struct EventsState {
    dispatcher: Arc<EventDispatcher>,
}

pub fn router(dispatcher: Arc<EventDispatcher>) -> Router {
    Router::new().route("/slack/events", post(slack_events)).with_state(EventsState { dispatcher })
}

/// The Slack Events API entry point.
///
/// Slack retries deliveries that are not acknowledged within three seconds,
/// so handlers run on the background task group and the request is answered
/// as soon as the work is spawned. Malformed callbacks are acknowledged too,
/// a retry would not make them parseable.
pub async fn slack_events(
    State(state): State<EventsState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match body["type"].as_str() {
        Some("url_verification") => {
            let challenge = body["challenge"].as_str().unwrap_or_default();
            (StatusCode::OK, Json(json!({ "challenge": challenge })))
        }
        Some("event_callback") => {
            match EventCallback::parse(&body) {
                Ok(callback) => state.dispatcher.dispatch(callback).await,
                Err(error) => warn!(error = %error, "discarding unparseable event callback"),
            }
            (StatusCode::OK, Json(json!({})))
        }
        other => {
            warn!(payload_type = other.unwrap_or("none"), "ignoring unknown payload type");
            (StatusCode::OK, Json(json!({})))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use hindsight_slack::events::SlackEventType;
    use hindsight_slack::{EventHandler, EventHandlerError, TaskGroup};

    use super::*;

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        fn event_type(&self) -> SlackEventType {
            SlackEventType::ChannelDeleted
        }

        async fn handle(&self, _callback: &EventCallback) -> Result<(), EventHandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn state_with_counter(calls: Arc<AtomicUsize>) -> (EventsState, Arc<TaskGroup>) {
        let tasks = Arc::new(TaskGroup::new());
        let mut dispatcher = EventDispatcher::new(tasks.clone());
        dispatcher.register(CountingHandler { calls });
        (EventsState { dispatcher: Arc::new(dispatcher) }, tasks)
    }

    #[tokio::test]
    async fn url_verification_echoes_the_challenge() {
        let (state, _tasks) = state_with_counter(Arc::new(AtomicUsize::new(0)));
        let body = json!({ "type": "url_verification", "challenge": "c0ffee" });

        let (status, Json(payload)) = slack_events(State(state), Json(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["challenge"], "c0ffee");
    }

    #[tokio::test]
    async fn event_callbacks_reach_the_registered_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (state, tasks) = state_with_counter(calls.clone());
        let body = json!({
            "type": "event_callback",
            "team_id": "T1",
            "event_time": 1_629_470_261,
            "authorizations": [{"user_id": "B1"}],
            "event": { "type": "channel_deleted", "channel": "C1" },
        });

        let (status, _) = slack_events(State(state), Json(body)).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(tasks.drain(Duration::from_secs(1)).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_callbacks_are_acknowledged_without_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (state, tasks) = state_with_counter(calls.clone());
        let body = json!({ "type": "event_callback", "event": {} });

        let (status, _) = slack_events(State(state), Json(body)).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(tasks.drain(Duration::from_secs(1)).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
