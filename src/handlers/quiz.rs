// src/handlers/quiz.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz::{
        OptionRow, PublicQuiz, QuestionResult, QuestionRow, Quiz, QuizListItem, QuizQuestion,
        QuizRow, QuizStatus, SubmitQuizRequest, SubmitQuizResponse,
    },
    state::Caches,
};

pub const PUBLISHED_SCOPE: &str = "published";
pub const ALL_SCOPE: &str = "all";

/// Loads a quiz with its questions and options straight from the database.
pub async fn load_quiz(pool: &SqlitePool, id: i64) -> Result<Quiz, AppError> {
    let row = sqlx::query_as::<_, QuizRow>(
        r#"
        SELECT id, title, description, difficulty, status, time_limit, created_by, created_at, updated_at
        FROM quizzes
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))?;

    let questions = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT id, quiz_id, question, explanation, allow_multiple_answers, order_index
        FROM quiz_questions
        WHERE quiz_id = ?
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, OptionRow>(
        r#"
        SELECT o.id, o.question_id, o.text, o.is_correct, o.order_index
        FROM quiz_options o
        JOIN quiz_questions q ON q.id = o.question_id
        WHERE q.quiz_id = ?
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Quiz::from_rows(row, questions, options))
}

/// `load_quiz` behind the 5-minute memo.
pub async fn cached_quiz(pool: &SqlitePool, caches: &Caches, id: i64) -> Result<Arc<Quiz>, AppError> {
    caches
        .quizzes
        .get_or_try_init(id, || async move { load_quiz(pool, id).await.map(Arc::new) })
        .await
}

/// Quiz list items, newest first. `scope` is either `PUBLISHED_SCOPE` or `ALL_SCOPE`.
pub async fn cached_quiz_list(
    pool: &SqlitePool,
    caches: &Caches,
    scope: &'static str,
) -> Result<Arc<Vec<QuizListItem>>, AppError> {
    caches
        .quiz_lists
        .get_or_try_init(scope, || async move {
            let filter = if scope == PUBLISHED_SCOPE {
                "WHERE q.status = 'published'"
            } else {
                ""
            };
            let items = sqlx::query_as::<_, QuizListItem>(&format!(
                r#"
                SELECT
                    q.id, q.title, q.description, q.difficulty, q.status,
                    (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) AS question_count,
                    q.time_limit, q.created_at, q.updated_at
                FROM quizzes q
                {}
                ORDER BY q.created_at DESC, q.id DESC
                "#,
                filter
            ))
            .fetch_all(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list quizzes: {:?}", e);
                AppError::from(e)
            })?;
            Ok(Arc::new(items))
        })
        .await
}

async fn published_quiz(pool: &SqlitePool, caches: &Caches, id: i64) -> Result<Arc<Quiz>, AppError> {
    let quiz = cached_quiz(pool, caches, id).await?;
    if quiz.status != QuizStatus::Published {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }
    Ok(quiz)
}

/// A single-answer question counts when exactly one option is selected and it
/// is correct. A multi-answer question counts only when the selection equals
/// the set of correct options.
pub fn is_answer_correct(question: &QuizQuestion, selected: &[i64]) -> bool {
    let correct: HashSet<i64> = question
        .options
        .iter()
        .filter(|o| o.is_correct)
        .filter_map(|o| o.id)
        .collect();

    if question.allow_multiple_answers {
        let chosen: HashSet<i64> = selected.iter().copied().collect();
        !correct.is_empty() && chosen == correct
    } else {
        matches!(selected, [only] if correct.contains(only))
    }
}

/// Scores a submission. Unanswered questions count as wrong.
pub fn score_quiz(quiz: &Quiz, answers: &HashMap<i64, Vec<i64>>) -> SubmitQuizResponse {
    let results: Vec<QuestionResult> = quiz
        .questions
        .iter()
        .filter_map(|q| {
            let id = q.id?;
            let selected = answers.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            Some(QuestionResult {
                question_id: id,
                correct: is_answer_correct(q, selected),
                correct_option_ids: q.options.iter().filter(|o| o.is_correct).filter_map(|o| o.id).collect(),
                explanation: q.explanation.clone(),
            })
        })
        .collect();

    let total_questions = results.len();
    let correct_count = results.iter().filter(|r| r.correct).count();
    let percentage = if total_questions == 0 {
        0
    } else {
        ((correct_count as f64 / total_questions as f64) * 100.0).round() as i64
    };

    SubmitQuizResponse {
        correct_count,
        total_questions,
        percentage,
        results,
    }
}

/// Lists published quizzes.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
) -> Result<impl IntoResponse, AppError> {
    let items = cached_quiz_list(&pool, &caches, PUBLISHED_SCOPE).await?;
    Ok(Json(items.as_ref().clone()))
}

/// One published quiz, without correctness flags or explanations.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = published_quiz(&pool, &caches, id).await?;
    Ok(Json(PublicQuiz::from(quiz.as_ref().clone())))
}

/// Scores the submitted answers against the published quiz.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    State(caches): State<Arc<Caches>>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = published_quiz(&pool, &caches, id).await?;

    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let response = score_quiz(&quiz, &req.answers);
    tracing::info!(
        "Quiz {} submitted: {}/{} correct",
        id,
        response.correct_count,
        response.total_questions
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{Difficulty, QuizOption};
    use chrono::Utc;

    fn option(id: i64, is_correct: bool) -> QuizOption {
        QuizOption {
            id: Some(id),
            text: format!("option {}", id),
            is_correct,
        }
    }

    fn question(id: i64, multiple: bool, options: Vec<QuizOption>) -> QuizQuestion {
        QuizQuestion {
            id: Some(id),
            question: format!("question {}", id),
            explanation: Some(format!("because {}", id)),
            allow_multiple_answers: multiple,
            order: id,
            options,
        }
    }

    fn quiz(questions: Vec<QuizQuestion>) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: 1,
            title: "Vùng kinh tế".to_string(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            status: QuizStatus::Published,
            time_limit: None,
            questions,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_single_answer_correct_option() {
        let q = question(1, false, vec![option(10, true), option(11, false)]);
        assert!(is_answer_correct(&q, &[10]));
        assert!(!is_answer_correct(&q, &[11]));
        assert!(!is_answer_correct(&q, &[]));
        assert!(!is_answer_correct(&q, &[10, 11]));
    }

    #[test]
    fn test_multi_answer_requires_exact_set() {
        let q = question(
            2,
            true,
            vec![option(20, true), option(21, true), option(22, false)],
        );
        assert!(is_answer_correct(&q, &[21, 20]));
        assert!(!is_answer_correct(&q, &[20]));
        assert!(!is_answer_correct(&q, &[20, 21, 22]));
    }

    #[test]
    fn test_score_half() {
        let quiz = quiz(vec![
            question(1, false, vec![option(10, true), option(11, false)]),
            question(2, true, vec![option(20, true), option(21, true), option(22, false)]),
        ]);

        let mut answers = HashMap::new();
        answers.insert(1, vec![10]);
        answers.insert(2, vec![20]); // Incomplete selection

        let result = score_quiz(&quiz, &answers);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.percentage, 50);
        assert_eq!(result.results[1].correct_option_ids, vec![20, 21]);
        assert_eq!(result.results[1].explanation.as_deref(), Some("because 2"));
    }

    #[test]
    fn test_score_rounds_percentage() {
        let quiz = quiz(vec![
            question(1, false, vec![option(10, true), option(11, false)]),
            question(2, false, vec![option(20, true), option(21, false)]),
            question(3, false, vec![option(30, true), option(31, false)]),
        ]);

        let mut answers = HashMap::new();
        answers.insert(1, vec![10]);
        answers.insert(2, vec![21]);

        let result = score_quiz(&quiz, &answers);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.percentage, 33);
    }

    #[test]
    fn test_score_zero_questions() {
        let result = score_quiz(&quiz(vec![]), &HashMap::new());
        assert_eq!(result.total_questions, 0);
        assert_eq!(result.percentage, 0);
    }
}
