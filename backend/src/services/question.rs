//! Ask-an-expert questions and answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{check, is_unique_violation};

/// Question service
#[derive(Clone)]
pub struct QuestionService {
    db: PgPool,
}

/// A question with its answer, if it has one
#[derive(Debug, Clone, Serialize)]
pub struct QuestionThread {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub farmer_username: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub answer: Option<Answer>,
}

/// An expert's answer
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub id: Uuid,
    pub expert_id: Uuid,
    pub expert_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Question joined with its optional answer
#[derive(Debug, sqlx::FromRow)]
struct ThreadRow {
    id: Uuid,
    farmer_id: Uuid,
    farmer_username: String,
    title: String,
    body: String,
    created_at: DateTime<Utc>,
    answer_id: Option<Uuid>,
    expert_id: Option<Uuid>,
    expert_username: Option<String>,
    answer_body: Option<String>,
    answered_at: Option<DateTime<Utc>>,
}

impl From<ThreadRow> for QuestionThread {
    fn from(row: ThreadRow) -> Self {
        let answer = match (
            row.answer_id,
            row.expert_id,
            row.expert_username,
            row.answer_body,
            row.answered_at,
        ) {
            (Some(id), Some(expert_id), Some(expert_username), Some(body), Some(created_at)) => {
                Some(Answer {
                    id,
                    expert_id,
                    expert_username,
                    body,
                    created_at,
                })
            }
            _ => None,
        };

        Self {
            id: row.id,
            farmer_id: row.farmer_id,
            farmer_username: row.farmer_username,
            title: row.title,
            body: row.body,
            created_at: row.created_at,
            answer,
        }
    }
}

/// The question board: open questions and answered ones
#[derive(Debug, Serialize)]
pub struct QuestionBoard {
    pub unanswered: Vec<QuestionThread>,
    pub answered: Vec<QuestionThread>,
}

/// Input for asking a question
#[derive(Debug, Deserialize, Validate)]
pub struct AskQuestionInput {
    #[validate(custom = "check_title")]
    pub title: String,
    #[validate(custom = "check_body")]
    pub body: String,
}

/// Input for answering a question
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerInput {
    #[validate(custom = "check_body")]
    pub body: String,
}

fn check_title(title: &str) -> Result<(), validator::ValidationError> {
    check(validation::validate_text(title, 200))
}

fn check_body(body: &str) -> Result<(), validator::ValidationError> {
    check(validation::validate_text(body, 5000))
}

const THREAD_QUERY: &str = r#"
    SELECT q.id, q.farmer_id, f.username AS farmer_username, q.title, q.body, q.created_at,
           a.id AS answer_id, a.expert_id, e.username AS expert_username,
           a.body AS answer_body, a.created_at AS answered_at
    FROM questions q
    JOIN users f ON f.id = q.farmer_id
    LEFT JOIN answers a ON a.question_id = q.id
    LEFT JOIN users e ON e.id = a.expert_id
"#;

impl QuestionService {
    /// Create a new QuestionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Every question, split into unanswered and answered, newest first
    pub async fn board(&self) -> AppResult<QuestionBoard> {
        let rows = sqlx::query_as::<_, ThreadRow>(&format!(
            "{THREAD_QUERY} ORDER BY q.created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        let (answered, unanswered): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .map(QuestionThread::from)
            .partition(|t| t.answer.is_some());
        Ok(QuestionBoard {
            unanswered,
            answered,
        })
    }

    /// Get one question with its answer
    pub async fn get(&self, question_id: Uuid) -> AppResult<QuestionThread> {
        sqlx::query_as::<_, ThreadRow>(&format!("{THREAD_QUERY} WHERE q.id = $1"))
            .bind(question_id)
            .fetch_optional(&self.db)
            .await?
            .map(QuestionThread::from)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
    }

    /// Post a new question
    pub async fn ask(&self, farmer_id: Uuid, input: AskQuestionInput) -> AppResult<QuestionThread> {
        input.validate()?;

        let question_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO questions (farmer_id, title, body) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(farmer_id)
        .bind(input.title.trim())
        .bind(input.body.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%question_id, %farmer_id, "Question asked");
        self.get(question_id).await
    }

    /// Answer a question. A question takes one answer only.
    pub async fn answer(
        &self,
        expert_id: Uuid,
        question_id: Uuid,
        input: AnswerInput,
    ) -> AppResult<QuestionThread> {
        input.validate()?;

        let existing = self.get(question_id).await?;
        if existing.answer.is_some() {
            return Err(already_answered());
        }

        sqlx::query("INSERT INTO answers (question_id, expert_id, body) VALUES ($1, $2, $3)")
            .bind(question_id)
            .bind(expert_id)
            .bind(input.body.trim())
            .execute(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    already_answered()
                } else {
                    e.into()
                }
            })?;

        tracing::info!(%question_id, %expert_id, "Question answered");
        self.get(question_id).await
    }
}

fn already_answered() -> AppError {
    AppError::Conflict {
        resource: "answer".to_string(),
        message: "This question has already been answered".to_string(),
    }
}
