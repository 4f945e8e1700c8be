use crate::handlers;
use crate::middleware::require_session;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use shared::config::ServerConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    // Routes reachable without a session
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/users", post(handlers::register_user))
        .route("/api/auth/session", post(handlers::sign_in));

    let protected = Router::new()
        // Session
        .route("/api/auth/session", delete(handlers::sign_out))
        .route("/api/auth/me", get(handlers::current_user))
        // Users and their collections
        .route("/api/users/{user}", get(handlers::get_user))
        .route(
            "/api/users/{user}/study-sessions",
            get(handlers::list_study_sessions),
        )
        .route("/api/users/{user}/documents", get(handlers::list_documents))
        .route(
            "/api/users/{user}/flashcard-decks",
            get(handlers::list_flashcard_decks),
        )
        .route("/api/users/{user}/quizzes", get(handlers::list_quizzes))
        .route(
            "/api/users/{user}/chat-conversations",
            get(handlers::list_chat_conversations),
        )
        // Study sessions and documents
        .route("/api/study-sessions", post(handlers::create_study_session))
        .route("/api/documents", post(handlers::create_document))
        .route("/api/documents/upload", post(handlers::upload_document))
        .route("/api/documents/{id}", delete(handlers::delete_document))
        // Flashcards
        .route("/api/flashcard-decks", post(handlers::create_flashcard_deck))
        .route(
            "/api/flashcard-decks/{id}",
            get(handlers::get_flashcard_deck),
        )
        .route(
            "/api/flashcard-decks/{id}/progress",
            patch(handlers::update_deck_progress),
        )
        .route(
            "/api/flashcard-decks/{id}/flashcards",
            get(handlers::list_flashcards),
        )
        .route("/api/flashcards", post(handlers::create_flashcard))
        .route(
            "/api/flashcards/{id}/mastery",
            patch(handlers::update_flashcard_mastery),
        )
        // Quizzes
        .route("/api/quizzes", post(handlers::create_quiz))
        .route("/api/quizzes/{id}", get(handlers::get_quiz))
        .route(
            "/api/quizzes/{id}/progress",
            patch(handlers::update_quiz_progress),
        )
        .route(
            "/api/quizzes/{id}/questions",
            get(handlers::list_quiz_questions),
        )
        .route("/api/quiz-questions", post(handlers::create_quiz_question))
        // Chat
        .route(
            "/api/chat-conversations",
            post(handlers::create_chat_conversation),
        )
        .route(
            "/api/chat-conversations/{id}/messages",
            get(handlers::list_chat_messages),
        )
        .route("/api/chat-messages", post(handlers::create_chat_message))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public)
        .merge(protected)
        // Middleware
        .layer(cors_layer(&config.allowed_origins))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS. `*` mirrors the caller's origin, since a literal
/// wildcard cannot be combined with cookies.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
