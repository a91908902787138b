// src/models/quiz.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QuizStatus {
    Draft,
    Published,
    Archived,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuizRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub status: QuizStatus,
    pub time_limit: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'quiz_questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub quiz_id: i64,
    pub question: String,
    pub explanation: Option<String>,
    pub allow_multiple_answers: bool,
    pub order_index: i64,
}

/// Represents the 'quiz_options' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct OptionRow {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub order_index: i64,
}

/// A quiz with all of its questions and options, as the editor sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub status: QuizStatus,
    /// Minutes.
    pub time_limit: Option<i64>,
    pub questions: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// `None` until the question has been saved.
    pub id: Option<i64>,
    pub question: String,
    pub explanation: Option<String>,
    pub allow_multiple_answers: bool,
    pub order: i64,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: Option<i64>,
    pub text: String,
    pub is_correct: bool,
}

impl Quiz {
    /// Assembles a quiz from its rows. Questions and options are ordered by `order_index`.
    pub fn from_rows(row: QuizRow, mut questions: Vec<QuestionRow>, mut options: Vec<OptionRow>) -> Self {
        questions.sort_by_key(|q| q.order_index);
        options.sort_by_key(|o| o.order_index);

        let mut by_question: HashMap<i64, Vec<QuizOption>> = HashMap::new();
        for o in options {
            by_question.entry(o.question_id).or_default().push(QuizOption {
                id: Some(o.id),
                text: o.text,
                is_correct: o.is_correct,
            });
        }

        let questions = questions
            .into_iter()
            .map(|q| QuizQuestion {
                id: Some(q.id),
                options: by_question.remove(&q.id).unwrap_or_default(),
                question: q.question,
                explanation: q.explanation,
                allow_multiple_answers: q.allow_multiple_answers,
                order: q.order_index,
            })
            .collect();

        Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            difficulty: row.difficulty,
            status: row.status,
            time_limit: row.time_limit,
            questions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// List view of a quiz (no questions loaded).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub status: QuizStatus,
    pub question_count: i64,
    pub time_limit: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending a quiz to a player (no correctness flags, no explanations).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub time_limit: Option<i64>,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: Option<i64>,
    pub question: String,
    pub allow_multiple_answers: bool,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: Option<i64>,
    pub text: String,
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        PublicQuiz {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            difficulty: quiz.difficulty,
            time_limit: quiz.time_limit,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    question: q.question,
                    allow_multiple_answers: q.allow_multiple_answers,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| PublicOption { id: o.id, text: o.text })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// DTO for creating a new quiz. New quizzes always start as drafts.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 chars"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 600))]
    pub time_limit: Option<i64>,
}

/// DTO for updating quiz metadata. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<QuizStatus>,
    #[validate(range(min = 1, max = 600))]
    pub time_limit: Option<i64>,
}

impl UpdateQuizRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.difficulty.is_none()
            && self.status.is_none()
            && self.time_limit.is_none()
    }
}

/// DTO for saving an entire quiz: metadata, questions and options.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub difficulty: Difficulty,
    pub status: QuizStatus,
    #[validate(range(min = 1, max = 600))]
    pub time_limit: Option<i64>,
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionInput {
    /// Absent for questions created in the editor since the last save.
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[serde(default)]
    pub allow_multiple_answers: bool,
    pub order: i64,
    #[validate(length(min = 2, max = 10), nested)]
    pub options: Vec<OptionInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OptionInput {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    pub is_correct: bool,
}

/// DTO for submitting answers.
/// Key: question id. Value: the selected option ids.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: HashMap<i64, Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub correct: bool,
    pub correct_option_ids: Vec<i64>,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub correct_count: usize,
    pub total_questions: usize,
    pub percentage: i64,
    pub results: Vec<QuestionResult>,
}

/// A draft as persisted by the draft store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub quiz: Quiz,
    pub saved_at: DateTime<Utc>,
}
