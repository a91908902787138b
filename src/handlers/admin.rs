// src/handlers/admin.rs

use std::{collections::HashSet, sync::Arc};

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::quiz::{ALL_SCOPE, cached_quiz, cached_quiz_list, load_quiz},
    models::quiz::{CreateQuizRequest, QuizStatus, SaveQuizRequest, UpdateQuizRequest},
    state::Caches,
    utils::{
        draft::DraftStore,
        html::{clean_html, clean_optional},
        jwt::Claims,
    },
};

/// Lists every quiz regardless of status.
/// Admin only.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
) -> Result<impl IntoResponse, AppError> {
    let items = cached_quiz_list(&pool, &caches, ALL_SCOPE).await?;
    Ok(Json(items.as_ref().clone()))
}

/// Full quiz including correctness flags.
/// Admin only.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = cached_quiz(&pool, &caches, id).await?;
    Ok(Json(quiz.as_ref().clone()))
}

/// Creates a quiz. New quizzes always start as drafts without questions.
/// Admin only.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, difficulty, status, time_limit, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(payload.difficulty)
    .bind(QuizStatus::Draft)
    .bind(payload.time_limit)
    .bind(claims.user_id()?)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::from(e)
    })?;

    caches.invalidate_quiz(id);
    tracing::info!("Quiz {} created by user {}", id, claims.sub);

    let quiz = load_quiz(&pool, id).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates quiz metadata. Only the provided fields change.
/// Admin only.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new("UPDATE quizzes SET updated_at = ");
    query_builder.push_bind(Utc::now());
    if let Some(title) = &payload.title {
        query_builder.push(", title = ").push_bind(clean_html(title));
    }
    if let Some(description) = &payload.description {
        query_builder.push(", description = ").push_bind(clean_html(description));
    }
    if let Some(difficulty) = payload.difficulty {
        query_builder.push(", difficulty = ").push_bind(difficulty);
    }
    if let Some(status) = payload.status {
        query_builder.push(", status = ").push_bind(status);
    }
    if let Some(time_limit) = payload.time_limit {
        query_builder.push(", time_limit = ").push_bind(time_limit);
    }
    query_builder.push(" WHERE id = ").push_bind(id);

    let result = query_builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz {}: {:?}", id, e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }

    caches.invalidate_quiz(id);
    Ok(Json(load_quiz(&pool, id).await?))
}

/// Deletes a quiz; questions and options go with it. Any draft is discarded.
/// Admin only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    State(drafts): State<DraftStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz {}: {:?}", id, e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }

    caches.invalidate_quiz(id);
    if let Err(e) = drafts.delete(id).await {
        tracing::warn!("Failed to discard draft of deleted quiz {}: {:?}", id, e);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Saves an entire quiz in one transaction.
///
/// * Updates the metadata.
/// * Deletes questions missing from the payload.
/// * Updates existing questions and replaces their options.
/// * Inserts questions without an id, with their options.
///
/// The saved draft is discarded on success.
/// Admin only.
pub async fn save_quiz_content(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    State(drafts): State<DraftStore>,
    Path(id): Path<i64>,
    Json(payload): Json<SaveQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    for (idx, question) in payload.questions.iter().enumerate() {
        if !question.options.iter().any(|o| o.is_correct) {
            return Err(AppError::BadRequest(format!(
                "Question {} needs at least one correct option",
                idx + 1
            )));
        }
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE quizzes
        SET title = ?, description = ?, difficulty = ?, status = ?, time_limit = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(payload.difficulty)
    .bind(payload.status)
    .bind(payload.time_limit)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }

    let existing: HashSet<i64> = sqlx::query_scalar::<_, i64>("SELECT id FROM quiz_questions WHERE quiz_id = ?")
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

    let kept: HashSet<i64> = payload.questions.iter().filter_map(|q| q.id).collect();
    if let Some(foreign) = kept.difference(&existing).next() {
        return Err(AppError::BadRequest(format!(
            "Question {} does not belong to quiz {}",
            foreign, id
        )));
    }

    for removed in existing.difference(&kept) {
        sqlx::query("DELETE FROM quiz_questions WHERE id = ?")
            .bind(removed)
            .execute(&mut *tx)
            .await?;
    }

    for question in &payload.questions {
        let question_id = match question.id {
            Some(question_id) => {
                sqlx::query(
                    r#"
                    UPDATE quiz_questions
                    SET question = ?, explanation = ?, allow_multiple_answers = ?, order_index = ?
                    WHERE id = ?
                    "#,
                )
                .bind(clean_html(&question.question))
                .bind(clean_optional(question.explanation.as_deref()))
                .bind(question.allow_multiple_answers)
                .bind(question.order)
                .bind(question_id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM quiz_options WHERE question_id = ?")
                    .bind(question_id)
                    .execute(&mut *tx)
                    .await?;
                question_id
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO quiz_questions (quiz_id, question, explanation, allow_multiple_answers, order_index)
                    VALUES (?, ?, ?, ?, ?)
                    RETURNING id
                    "#,
                )
                .bind(id)
                .bind(clean_html(&question.question))
                .bind(clean_optional(question.explanation.as_deref()))
                .bind(question.allow_multiple_answers)
                .bind(question.order)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        for (order_index, option) in question.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quiz_options (question_id, text, is_correct, order_index) VALUES (?, ?, ?, ?)",
            )
            .bind(question_id)
            .bind(clean_html(&option.text))
            .bind(option.is_correct)
            .bind(order_index as i64)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit quiz {}: {:?}", id, e);
        AppError::from(e)
    })?;

    caches.invalidate_quiz(id);
    if let Err(e) = drafts.delete(id).await {
        tracing::warn!("Failed to discard draft of saved quiz {}: {:?}", id, e);
    }
    tracing::info!("Quiz {} saved with {} questions", id, payload.questions.len());

    Ok(Json(load_quiz(&pool, id).await?))
}
