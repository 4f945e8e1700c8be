use crate::error::ApiError;
use crate::sessions::token_from_cookie_header;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use shared_http::api::User;
use tracing::debug;

/// The user behind the request's session cookie.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Session middleware: resolves the `spark_session` cookie or answers 401.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(token_from_cookie_header)
        .map(str::to_string)
        .ok_or_else(|| {
            debug!("Rejected {} {}: no session cookie", request.method(), request.uri());
            ApiError::Unauthorized
        })?;

    let user_id = state
        .sessions
        .user_id(&token)
        .await
        .ok_or(ApiError::Unauthorized)?;
    let user = state
        .storage
        .user(user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser { user, token });
    Ok(next.run(request).await)
}
