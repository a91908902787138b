// src/handlers/draft.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, models::quiz::Quiz, utils::draft::DraftStore};

/// The stored draft of a quiz, or `null` when there is none.
/// Admin only.
pub async fn get_draft(
    State(drafts): State<DraftStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(drafts.load(id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveDraftParams {
    /// Write now instead of waiting for the debounce delay (e.g. the editor is closing).
    #[serde(default)]
    pub flush: bool,
}

/// Schedules a debounced write of the editor state, or writes it at once with `?flush=true`.
/// Admin only.
pub async fn save_draft(
    State(drafts): State<DraftStore>,
    Path(id): Path<i64>,
    Query(params): Query<SaveDraftParams>,
    Json(quiz): Json<Quiz>,
) -> Result<Response, AppError> {
    if quiz.id != id {
        return Err(AppError::BadRequest(format!(
            "Draft belongs to quiz {}, not {}",
            quiz.id, id
        )));
    }

    if params.flush {
        let draft = drafts.save(id, &quiz).await?;
        return Ok(Json(draft).into_response());
    }

    drafts.save_debounced(id, quiz);
    Ok((StatusCode::ACCEPTED, Json(json!({ "scheduled": true }))).into_response())
}

/// Admin only.
pub async fn has_draft(
    State(drafts): State<DraftStore>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    Json(json!({ "exists": drafts.exists(id).await }))
}

/// Admin only.
pub async fn delete_draft(
    State(drafts): State<DraftStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    drafts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ids of quizzes with a stored draft.
/// Admin only.
pub async fn list_drafts(State(drafts): State<DraftStore>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(drafts.list_ids().await?))
}

/// Admin only.
pub async fn clear_drafts(State(drafts): State<DraftStore>) -> Result<impl IntoResponse, AppError> {
    let cleared = drafts.clear().await?;
    tracing::info!("Cleared {} quiz drafts", cleared);
    Ok(Json(json!({ "cleared": cleared })))
}
