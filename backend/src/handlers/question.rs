//! Ask-an-expert handlers

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::{created, expert, farmer};
use crate::middleware::CurrentUser;
use crate::services::question::{AnswerInput, AskQuestionInput, QuestionBoard, QuestionThread};
use crate::services::QuestionService;
use crate::AppState;

/// All questions, answered and unanswered
pub async fn list_questions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<QuestionBoard>> {
    Ok(Json(QuestionService::new(state.db).board().await?))
}

/// Ask a question (farmers)
pub async fn ask_question(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AskQuestionInput>,
) -> AppResult<Response> {
    let user = farmer(&current_user)?;

    let question = QuestionService::new(state.db)
        .ask(user.user_id, input)
        .await?;
    Ok(created(format!("/api/v1/questions/{}", question.id), question))
}

/// A question and its answer
pub async fn get_question(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(question_id): Path<Uuid>,
) -> AppResult<Json<QuestionThread>> {
    Ok(Json(QuestionService::new(state.db).get(question_id).await?))
}

/// Answer a question (experts)
pub async fn answer_question(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(question_id): Path<Uuid>,
    Json(input): Json<AnswerInput>,
) -> AppResult<Response> {
    let user = expert(&current_user)?;

    let thread = QuestionService::new(state.db)
        .answer(user.user_id, question_id, input)
        .await?;
    Ok(created(format!("/api/v1/questions/{}", thread.id), thread))
}
