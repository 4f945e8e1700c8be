use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{self, path_id};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use shared_http::api::{
    DeckProgressUpdate, Flashcard, FlashcardDeck, MasteryUpdate, NewFlashcard, NewFlashcardDeck,
};
use tracing::info;

/// GET /api/users/{user}/flashcard-decks
pub async fn list_flashcard_decks(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<FlashcardDeck>>> {
    let user_id = path_id(&user)?;
    Ok(Json(state.storage.flashcard_decks(user_id).await?))
}

/// GET /api/flashcard-decks/{id}
pub async fn get_flashcard_deck(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FlashcardDeck>> {
    let id = path_id(&id)?;
    state
        .storage
        .flashcard_deck(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Flashcard deck not found".into()))
}

/// POST /api/flashcard-decks
pub async fn create_flashcard_deck(
    State(state): State<AppState>,
    payload: Result<Json<NewFlashcardDeck>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FlashcardDeck>)> {
    let deck = json_body(payload)?;
    validation::flashcard_deck(&deck)?;
    let deck = state.storage.create_flashcard_deck(deck).await?;
    Ok((StatusCode::CREATED, Json(deck)))
}

/// PATCH /api/flashcard-decks/{id}/progress
pub async fn update_deck_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<DeckProgressUpdate>, JsonRejection>,
) -> ApiResult<Json<FlashcardDeck>> {
    let id = path_id(&id)?;
    let progress = validation::deck_progress(&json_body(payload)?)?;
    let deck = state
        .storage
        .update_flashcard_deck_progress(id, progress)
        .await?;
    info!("DECK_PROGRESS: id={}, progress={}", deck.id, deck.progress);
    Ok(Json(deck))
}

/// GET /api/flashcard-decks/{id}/flashcards
pub async fn list_flashcards(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Flashcard>>> {
    let deck_id = path_id(&id)?;
    Ok(Json(state.storage.flashcards(deck_id).await?))
}

/// POST /api/flashcards
pub async fn create_flashcard(
    State(state): State<AppState>,
    payload: Result<Json<NewFlashcard>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Flashcard>)> {
    let card = json_body(payload)?;
    validation::flashcard(&card)?;
    let card = state.storage.create_flashcard(card).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// PATCH /api/flashcards/{id}/mastery
pub async fn update_flashcard_mastery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MasteryUpdate>, JsonRejection>,
) -> ApiResult<Json<Flashcard>> {
    let id = path_id(&id)?;
    let update = json_body(payload)?;
    let card = state
        .storage
        .update_flashcard_mastery(id, update.mastered)
        .await?;
    Ok(Json(card))
}
