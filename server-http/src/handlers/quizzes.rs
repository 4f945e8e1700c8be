use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{self, path_id};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shared_http::api::{NewQuiz, NewQuizQuestion, Quiz, QuizProgressUpdate, QuizQuestion};
use tracing::info;

/// GET /api/users/{user}/quizzes
pub async fn list_quizzes(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<Quiz>>> {
    let user_id = path_id(&user)?;
    Ok(Json(state.storage.quizzes(user_id).await?))
}

/// GET /api/quizzes/{id}
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Quiz>> {
    let id = path_id(&id)?;
    state
        .storage
        .quiz(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Quiz not found".into()))
}

/// POST /api/quizzes
pub async fn create_quiz(
    State(state): State<AppState>,
    payload: Result<Json<NewQuiz>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Quiz>)> {
    let quiz = json_body(payload)?;
    validation::quiz(&quiz)?;
    let quiz = state.storage.create_quiz(quiz).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// PATCH /api/quizzes/{id}/progress
///
/// Reaching the question count marks the quiz completed.
pub async fn update_quiz_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<QuizProgressUpdate>, JsonRejection>,
) -> ApiResult<Json<Quiz>> {
    let id = path_id(&id)?;
    let (progress, score) = validation::quiz_progress(&json_body(payload)?)?;
    let quiz = state
        .storage
        .update_quiz_progress(id, progress, score)
        .await?;
    info!(
        "QUIZ_PROGRESS: id={}, progress={}/{}, status={:?}",
        quiz.id, quiz.progress, quiz.question_count, quiz.status
    );
    Ok(Json(quiz))
}

/// GET /api/quizzes/{id}/questions
pub async fn list_quiz_questions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<QuizQuestion>>> {
    let quiz_id = path_id(&id)?;
    Ok(Json(state.storage.quiz_questions(quiz_id).await?))
}

/// POST /api/quiz-questions
pub async fn create_quiz_question(
    State(state): State<AppState>,
    payload: Result<Json<NewQuizQuestion>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<QuizQuestion>)> {
    let question = json_body(payload)?;
    validation::quiz_question(&question)?;
    let question = state.storage.create_quiz_question(question).await?;
    Ok((StatusCode::CREATED, Json(question)))
}
