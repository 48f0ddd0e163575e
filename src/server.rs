//! HTTP surface: router construction and the parse-event handler.

use crate::extractor::{EventExtractor, ExtractError};
use crate::openai::CompletionClient;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Application state shared across handlers. The extractor holds the only
/// external resource, a stateless LLM client handle, so cloning is cheap and
/// no locking is needed.
#[derive(Clone)]
pub struct AppState {
    extractor: Arc<EventExtractor>,
}

/// Build the application router around a completion client.
pub fn router(client: Arc<dyn CompletionClient>) -> Router {
    let state = AppState {
        extractor: Arc::new(EventExtractor::new(client)),
    };

    Router::new()
        .route("/health", get(health))
        .route("/parse-event", post(parse_event))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Parse free-form text into structured calendar events.
///
/// The body is read raw so a malformed JSON body and a missing `text` field
/// map to distinct 400 responses with structured bodies, rather than the
/// extractor rejection shape.
async fn parse_event(State(state): State<AppState>, body: String) -> Response {
    let data: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            error!("Rejected request with invalid JSON body: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid JSON in request body",
                &e.to_string(),
                &format!("{e:?}"),
            );
        }
    };

    let text = match data.get("text").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "No text provided",
                "The 'text' field is required in the request body",
                "",
            );
        }
    };
    let timezone = data
        .get("timezone")
        .and_then(Value::as_str)
        .unwrap_or("UTC")
        .to_string();

    match state.extractor.extract(&text, &timezone).await {
        // Re-wrap a bare single event so the wire contract is always
        // {"events": [...]}.
        Ok(parsed) => Json(json!({ "events": parsed.into_vec() })).into_response(),
        Err(e @ ExtractError::InvalidTimezone(_)) => {
            error!("Rejected request with unknown timezone: {e}");
            error_response(
                StatusCode::BAD_REQUEST,
                "Invalid timezone",
                &e.to_string(),
                &format!("{e:?}"),
            )
        }
        Err(e @ ExtractError::ExtractionFailed(_)) => {
            error!("Event extraction failed: {e}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "Event parsing failed",
                    "detail": e.to_string(),
                    "input_text": text,
                    "stack_trace": format!("{e:?}"),
                })),
            )
                .into_response()
        }
    }
}

fn error_response(status: StatusCode, label: &str, detail: &str, trace: &str) -> Response {
    (
        status,
        Json(json!({
            "error": label,
            "detail": detail,
            "stack_trace": trace,
        })),
    )
        .into_response()
}

/// Last-resort handler: a panic anywhere in the stack becomes the same
/// structured 500 body instead of a dropped connection.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Unexpected error in request handler: {detail}");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        &format!("Unexpected error: {detail}"),
        &detail,
    )
}
