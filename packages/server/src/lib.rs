//! HTTP surface of the bridge: dispatch, a health check and an event stream.

use std::sync::Arc;

use api::{Bridge, DispatchError, Dispatcher, HookManager, JobSystem};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use serde_json::{Value, json};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    hooks: Arc<HookManager>,
    jobs: JobSystem,
}

/// Build the router for a running bridge.
///
/// - `GET /healthz`
/// - `POST /dispatch/{route}` with the JSON payload as body (empty is `{}`)
/// - `GET /events`, hook and job events as server-sent events
pub fn router(bridge: &Bridge) -> Router {
    let state = AppState {
        dispatcher: bridge.dispatcher(),
        hooks: bridge.hooks.clone(),
        jobs: bridge.jobs.clone(),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/dispatch/{route}", post(dispatch))
        .route("/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn dispatch(
    State(state): State<AppState>,
    Path(route): Path<String>,
    body: Bytes,
) -> Response {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => payload,
            Err(e) => {
                let body = json!({ "error": format!("Invalid JSON body: {}", e), "route": route });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
        }
    };

    match state.dispatcher.dispatch_route(&route, payload).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(&route, e),
    }
}

fn error_response(route: &str, error: DispatchError) -> Response {
    let status = match &error {
        DispatchError::RouteNotFound(_) | DispatchError::JobNotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::RouteExecution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let body = json!({
        "error": error.to_string(),
        "kind": error.kind(),
        "route": route,
    });
    (status, Json(body)).into_response()
}

/// Turn a broadcast receiver into an SSE stream. Lagging subscribers skip
/// the events they missed.
fn sse_stream<T, F>(
    rx: broadcast::Receiver<T>,
    to_event: F,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Result<Event, axum::Error> + Send + 'static,
{
    stream::unfold((rx, to_event), |(mut rx, to_event)| async move {
        loop {
            match rx.recv().await {
                Ok(item) => {
                    let event = to_event(item);
                    return Some((event, (rx, to_event)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let hooks = sse_stream(state.hooks.stream(), |e| {
        Event::default().event("hook").json_data(e)
    });
    let jobs = sse_stream(state.jobs.subscribe(), |e| {
        Event::default().event("job").json_data(e)
    });

    Sse::new(stream::select(hooks, jobs)).keep_alive(KeepAlive::default())
}

