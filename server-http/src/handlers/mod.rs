pub mod auth;
pub mod chat;
pub mod documents;
pub mod flashcards;
pub mod health;
pub mod quizzes;
pub mod study_sessions;
pub mod users;

pub use auth::{current_user, sign_in, sign_out};
pub use chat::{
    create_chat_conversation, create_chat_message, list_chat_conversations, list_chat_messages,
};
pub use documents::{create_document, delete_document, list_documents, upload_document};
pub use flashcards::{
    create_flashcard, create_flashcard_deck, get_flashcard_deck, list_flashcard_decks,
    list_flashcards, update_deck_progress, update_flashcard_mastery,
};
pub use health::health_check;
pub use quizzes::{
    create_quiz, create_quiz_question, get_quiz, list_quiz_questions, list_quizzes,
    update_quiz_progress,
};
pub use study_sessions::{create_study_session, list_study_sessions};
pub use users::{get_user, register_user};

use crate::error::ApiResult;
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwraps a JSON body, turning a rejection into a 400 with a message.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(body) = payload?;
    Ok(body)
}
