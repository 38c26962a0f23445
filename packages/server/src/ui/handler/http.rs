//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::EventId,
    infrastructure::dto::http::{
        CreateEventRequest, ErrorDto, EventDto, RoomDebugDto, StatsDto,
    },
    ui::state::AppState,
    usecase::{CreateEventError, GetEventError},
};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorDto::new(message))).into_response()
}

fn get_event_error_response(err: GetEventError) -> Response {
    match err {
        GetEventError::EventNotFound => error_response(StatusCode::NOT_FOUND, err.to_string()),
        GetEventError::Repository(e) => {
            tracing::error!("Event store error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create an event
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateEventRequest>,
) -> Response {
    match state
        .create_event_usecase
        .execute(request.name, request.host_id)
        .await
    {
        Ok(event) => (StatusCode::CREATED, Json(EventDto::from(event))).into_response(),
        Err(CreateEventError::InvalidInput(e)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(CreateEventError::Repository(e)) => {
            tracing::error!("Failed to create event: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Get event by ID
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<u64>,
) -> Response {
    match state.get_event_usecase.by_id(EventId::new(event_id)).await {
        Ok(event) => Json(EventDto::from(event)).into_response(),
        Err(e) => get_event_error_response(e),
    }
}

/// Get event by attendee PIN
pub async fn get_event_by_pin(
    State(state): State<Arc<AppState>>,
    Path(pin): Path<String>,
) -> Response {
    match state.get_event_usecase.by_pin(&pin).await {
        Ok(event) => Json(EventDto::from(event)).into_response(),
        Err(e) => get_event_error_response(e),
    }
}

/// Participant counts of an event
pub async fn get_event_stats(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<u64>,
) -> Response {
    match state.get_event_usecase.stats(EventId::new(event_id)).await {
        Ok(stats) => Json(StatsDto::from(stats)).into_response(),
        Err(e) => get_event_error_response(e),
    }
}

/// Debug endpoint: relay-side state of a room
pub async fn debug_room_state(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<u64>,
) -> Response {
    match state
        .relay_router
        .room_snapshot(EventId::new(event_id))
        .await
    {
        Ok(Some(room)) => Json(RoomDebugDto::from(room)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Room not found"),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}
