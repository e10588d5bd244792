//! HTTP surface: the discussion endpoint and health check.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use warroom_core::case::DiscussionRequest;
use warroom_core::events::{DiscussionEvent, EventEnvelope};
use warroom_core::ids::RunId;
use warroom_engine::{DiscussionStream, EngineError};

use crate::remote::RouteOutcome;
use crate::server::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

/// `POST /api/team-discussion`. Invalid cases are rejected with a 4xx
/// JSON body before any stream starts; valid ones return SSE from
/// either the remote backend or the local engine.
pub async fn team_discussion(
    State(state): State<AppState>,
    Json(request): Json<DiscussionRequest>,
) -> Response {
    let request = match request.normalize() {
        Ok(request) => request,
        Err(err) => {
            debug!(error = %err, "rejected discussion request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            )
                .into_response();
        }
    };
    if let Some(focus) = &request.focus_area {
        debug!(focus_area = %focus, "focus area noted");
    }

    match state.router.route(&request).await {
        RouteOutcome::Remote(upstream) => proxy_response(upstream),
        RouteOutcome::Local => local_response(state, request),
    }
}

/// Pipe the remote's bytes through untouched; no reframing, no
/// inspection.
fn proxy_response(upstream: reqwest::Response) -> Response {
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/event-stream")
        .to_string();
    let body = Body::from_stream(upstream.bytes_stream());
    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
    {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "failed to assemble proxy response");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

/// Spawn the engine for this connection and stream its events. The
/// run deadline is enforced here; the engine never watches the clock.
fn local_response(state: AppState, request: DiscussionRequest) -> Response {
    let (stream, rx) = DiscussionStream::channel();
    let run_id = RunId::new();
    let guard = state.runs.register(run_id.clone());
    let cancel = guard.token();
    let runner = state.runner.clone();
    let deadline = state.run_deadline;

    tokio::spawn(async move {
        let _guard = guard;
        let outcome = tokio::time::timeout(
            deadline,
            runner.run(run_id.clone(), &request, &stream, &cancel),
        )
        .await;
        match outcome {
            Ok(Ok(summary)) => {
                info!(
                    run_id = %summary.run_id,
                    messages = summary.total_messages,
                    "local run finished"
                );
            }
            Ok(Err(err)) if err.is_abort() => {
                debug!(run_id = %run_id, "local run aborted");
            }
            Ok(Err(EngineError::Consensus(err))) => {
                // The engine already emitted the terminal error event.
                warn!(run_id = %run_id, error = %err, "local run failed in consensus");
            }
            Ok(Err(err)) => {
                warn!(run_id = %run_id, error = %err, "local run failed");
                stream
                    .emit(DiscussionEvent::Error {
                        message: format!("Discussion aborted: {err}"),
                    })
                    .await;
            }
            Err(_) => {
                warn!(run_id = %run_id, deadline_secs = deadline.as_secs(), "run exceeded deadline");
                let err = EngineError::RunTimeout(deadline);
                stream
                    .emit(DiscussionEvent::Error {
                        message: format!("Discussion aborted: {err}"),
                    })
                    .await;
            }
        }
    });

    let events = ReceiverStream::new(rx).map(sse_frame);
    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn sse_frame(envelope: EventEnvelope) -> Result<Event, Infallible> {
    let payload = serde_json::to_string(&envelope).unwrap_or_else(|err| {
        warn!(error = %err, "event serialization failed");
        json!({
            "type": "error",
            "data": {"message": "event serialization failed"},
            "timestamp": envelope.timestamp,
        })
        .to_string()
    });
    Ok(Event::default().data(payload))
}
