use super::json_body;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::validation::{self, path_id};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shared_http::api::{NewStudySession, StudySession};

/// GET /api/users/{user}/study-sessions
pub async fn list_study_sessions(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<StudySession>>> {
    let user_id = path_id(&user)?;
    Ok(Json(state.storage.study_sessions(user_id).await?))
}

/// POST /api/study-sessions
pub async fn create_study_session(
    State(state): State<AppState>,
    payload: Result<Json<NewStudySession>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StudySession>)> {
    let session = json_body(payload)?;
    validation::study_session(&session)?;
    let session = state.storage.create_study_session(session).await?;
    Ok((StatusCode::CREATED, Json(session)))
}
