use super::json_body;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::validation::{self, path_id};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shared_http::api::{ChatConversation, ChatMessage, NewChatConversation, NewChatMessage};

/// GET /api/users/{user}/chat-conversations
pub async fn list_chat_conversations(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<ChatConversation>>> {
    let user_id = path_id(&user)?;
    Ok(Json(state.storage.chat_conversations(user_id).await?))
}

/// POST /api/chat-conversations
pub async fn create_chat_conversation(
    State(state): State<AppState>,
    payload: Result<Json<NewChatConversation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ChatConversation>)> {
    let conversation = json_body(payload)?;
    validation::chat_conversation(&conversation)?;
    let conversation = state.storage.create_chat_conversation(conversation).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/chat-conversations/{id}/messages - Oldest first
pub async fn list_chat_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let conversation_id = path_id(&id)?;
    Ok(Json(state.storage.chat_messages(conversation_id).await?))
}

/// POST /api/chat-messages
pub async fn create_chat_message(
    State(state): State<AppState>,
    payload: Result<Json<NewChatMessage>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let message = json_body(payload)?;
    validation::chat_message(&message)?;
    let message = state.storage.create_chat_message(message).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
