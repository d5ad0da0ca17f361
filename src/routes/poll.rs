use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::poll::{CreatePollRequest, PollSnapshot},
    error::AppError,
    services::poll_service,
    state::SharedState,
};

/// Poll history queries and lifecycle commands for dashboards.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/polls", get(list_polls).post(create_poll))
        .route("/api/polls/latest", get(latest_poll))
        .route("/api/polls/active/end", post(end_active_poll))
        .route("/api/polls/{id}", get(get_poll))
}

/// Every stored poll, newest first.
#[utoipa::path(
    get,
    path = "/api/polls",
    tag = "polls",
    responses(
        (status = 200, description = "Stored polls, newest first", body = [PollSnapshot]),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_polls(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PollSnapshot>>, AppError> {
    Ok(Json(poll_service::list_polls(&state).await?))
}

/// Most recently created poll, or `null` when none exists yet.
#[utoipa::path(
    get,
    path = "/api/polls/latest",
    tag = "polls",
    responses(
        (status = 200, description = "Latest poll, or null when none exists", body = PollSnapshot),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn latest_poll(
    State(state): State<SharedState>,
) -> Result<Json<Option<PollSnapshot>>, AppError> {
    Ok(Json(poll_service::latest_poll(&state).await?))
}

/// Retrieve a poll by its identifier.
#[utoipa::path(
    get,
    path = "/api/polls/{id}",
    tag = "polls",
    params(("id" = String, Path, description = "Identifier of the poll to retrieve")),
    responses(
        (status = 200, description = "Poll", body = PollSnapshot),
        (status = 404, description = "Unknown poll")
    )
)]
pub async fn get_poll(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PollSnapshot>, AppError> {
    Ok(Json(poll_service::get_poll(&state, &id).await?))
}

/// Open a new poll and broadcast it to connected clients.
#[utoipa::path(
    post,
    path = "/api/polls",
    tag = "polls",
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Poll started", body = PollSnapshot),
        (status = 400, description = "Invalid poll definition"),
        (status = 409, description = "Another poll is still active"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_poll(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreatePollRequest>>,
) -> Result<(StatusCode, Json<PollSnapshot>), AppError> {
    let snapshot = poll_service::create_poll(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Close the active poll immediately.
#[utoipa::path(
    post,
    path = "/api/polls/active/end",
    tag = "polls",
    responses(
        (status = 200, description = "Poll ended", body = PollSnapshot),
        (status = 404, description = "No poll is active"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn end_active_poll(
    State(state): State<SharedState>,
) -> Result<Json<PollSnapshot>, AppError> {
    Ok(Json(poll_service::end_active_poll(&state).await?))
}
