//! Axum Handlers for the REST API
//!
//! The chat relay plus read-only views over exam progress and results. It
//! uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::{
    models::{
        ChatPayload, ChatResponse, ErrorResponse, ProgressResponse, StatisticsResponse,
        StatisticsSummary,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

/// Relay one chat turn to the examiner.
///
/// Credential and backend problems are reported in `reply`, not as HTTP errors.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "Examiner reply and updated history", body = ChatResponse),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let history = payload.history.into_iter().map(Into::into).collect();
    let output = state
        .agent
        .handle_turn(&payload.message, history, &payload.api_key)
        .await;
    info!(
        model = %state.config.chat_model,
        turns = output.history.len(),
        "Chat turn completed"
    );

    Ok(Json(ChatResponse {
        reply: output.reply,
        history: output.history.into_iter().map(Into::into).collect(),
    }))
}

/// Aggregate statistics over all closed exams.
#[utoipa::path(
    get,
    path = "/statistics",
    responses(
        (status = 200, description = "Statistics report", body = StatisticsResponse)
    )
)]
pub async fn statistics(State(state): State<Arc<AppState>>) -> Json<StatisticsResponse> {
    let service = state.agent.service().lock().await;
    Json(StatisticsResponse {
        report: service.statistics(),
        summary: service.summary().map(StatisticsSummary::from),
    })
}

/// Where a candidate's exam currently stands.
#[utoipa::path(
    get,
    path = "/exams/{email}/progress",
    responses(
        (status = 200, description = "Exam progress", body = ProgressResponse),
        (status = 404, description = "Candidate not registered", body = ErrorResponse)
    ),
    params(
        ("email" = String, Path, description = "Candidate email")
    )
)]
pub async fn exam_progress(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let service = state.agent.service().lock().await;
    if service.registry().lookup(&email).is_none() && service.session(&email).is_none() {
        return Err(ApiError::NotFound(format!(
            "Candidate '{}' is not registered",
            email
        )));
    }
    let progress = service.progress(&email);
    Ok(Json(ProgressResponse::new(email, progress)))
}
