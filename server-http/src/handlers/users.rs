use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shared_http::api::{NewUser, User};
use tracing::info;

/// POST /api/users - Register a user, or return the existing one for its uid
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let new_user = json_body(payload)?;
    validation::user(&new_user)?;

    let (user, created) = state.storage.register_user(new_user).await?;
    if created {
        info!("REGISTER_USER: id={}, uid={}", user.id, user.uid);
        Ok((StatusCode::CREATED, Json(user)))
    } else {
        Ok((StatusCode::OK, Json(user)))
    }
}

/// GET /api/users/{uid} - Look a user up by external uid
pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<User>> {
    state
        .storage
        .user_by_uid(&uid)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}
