use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::sessions::SessionStore;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use shared_http::api::{SessionResponse, SignInRequest, User};
use tracing::{info, warn};

/// POST /api/auth/session - Open a session for a registered uid
///
/// The token travels in an HttpOnly cookie. An unknown uid is a 401, not a 404,
/// so the endpoint does not reveal which uids exist.
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(payload)?;
    let Some(user) = state.storage.user_by_uid(request.uid.trim()).await? else {
        warn!("SIGN_IN rejected for unknown uid");
        return Err(ApiError::Unauthorized);
    };

    let token = state.sessions.open(user.id).await;
    info!("SIGN_IN: user_id={}", user.id);

    let cookie = state.sessions.cookie(&token);
    let body = SessionResponse {
        user,
        expires_in: state.sessions.ttl().as_secs(),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// DELETE /api/auth/session - Close the caller's session
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> impl IntoResponse {
    state.sessions.close(&current.token).await;
    info!("SIGN_OUT: user_id={}", current.user.id);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, SessionStore::expired_cookie())],
    )
}

/// GET /api/auth/me
pub async fn current_user(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
