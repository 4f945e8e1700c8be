use crate::error::ApiError;
use shared_http::api::{
    DeckProgressUpdate, NewChatConversation, NewChatMessage, NewDocument, NewFlashcard,
    NewFlashcardDeck, NewQuiz, NewQuizQuestion, NewStudySession, NewUser, QuizProgressUpdate,
    RecordId,
};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' must not be empty")]
    Empty { field: &'static str },
    #[error("Field '{field}' must be a positive id")]
    InvalidId { field: &'static str },
    #[error("Field '{field}' must have at least {min} entries")]
    TooFew { field: &'static str, min: usize },
    #[error("Progress must be a number between 0 and 100")]
    DeckProgress,
    #[error("Progress must be a non-negative number")]
    QuizProgress,
    #[error("Score must be a number between 0 and 100")]
    Score,
    #[error("Invalid id '{0}'")]
    PathId(String),
    #[error("Missing field '{0}'")]
    Missing(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

pub type Validated<T> = Result<T, ValidationError>;

fn not_empty(field: &'static str, value: &str) -> Validated<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

fn record_id(field: &'static str, id: RecordId) -> Validated<()> {
    if id < 1 {
        return Err(ValidationError::InvalidId { field });
    }
    Ok(())
}

/// Parses an id taken from the URL path.
pub fn path_id(raw: &str) -> Validated<RecordId> {
    raw.parse::<RecordId>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| ValidationError::PathId(raw.to_string()))
}

pub fn user(user: &NewUser) -> Validated<()> {
    not_empty("uid", &user.uid)?;
    not_empty("username", &user.username)?;
    not_empty("email", &user.email)
}

pub fn study_session(session: &NewStudySession) -> Validated<()> {
    record_id("userId", session.user_id)?;
    not_empty("topic", &session.topic)
}

pub fn document(document: &NewDocument) -> Validated<()> {
    record_id("userId", document.user_id)?;
    not_empty("name", &document.name)?;
    not_empty("type", &document.kind)?;
    not_empty("url", &document.url)
}

pub fn flashcard_deck(deck: &NewFlashcardDeck) -> Validated<()> {
    record_id("userId", deck.user_id)?;
    not_empty("title", &deck.title)?;
    if deck.progress > 100 {
        return Err(ValidationError::DeckProgress);
    }
    Ok(())
}

pub fn flashcard(card: &NewFlashcard) -> Validated<()> {
    record_id("deckId", card.deck_id)?;
    not_empty("question", &card.question)?;
    not_empty("answer", &card.answer)
}

pub fn quiz(quiz: &NewQuiz) -> Validated<()> {
    record_id("userId", quiz.user_id)?;
    not_empty("title", &quiz.title)?;
    if quiz.score.is_some_and(|score| score > 100) {
        return Err(ValidationError::Score);
    }
    Ok(())
}

pub fn quiz_question(question: &NewQuizQuestion) -> Validated<()> {
    record_id("quizId", question.quiz_id)?;
    not_empty("questionText", &question.question_text)?;
    not_empty("correctAnswer", &question.correct_answer)?;
    if question.options.len() < 2 {
        return Err(ValidationError::TooFew {
            field: "options",
            min: 2,
        });
    }
    Ok(())
}

pub fn chat_conversation(conversation: &NewChatConversation) -> Validated<()> {
    record_id("userId", conversation.user_id)?;
    not_empty("title", &conversation.title)
}

pub fn chat_message(message: &NewChatMessage) -> Validated<()> {
    record_id("conversationId", message.conversation_id)?;
    not_empty("content", &message.content)
}

/// Deck progress is a whole percentage.
pub fn deck_progress(update: &DeckProgressUpdate) -> Validated<u8> {
    let progress = update.progress;
    if !progress.is_finite() || !(0.0..=100.0).contains(&progress) {
        return Err(ValidationError::DeckProgress);
    }
    Ok(progress.round() as u8)
}

/// Returns the completed question count and the optional score.
pub fn quiz_progress(update: &QuizProgressUpdate) -> Validated<(u32, Option<u8>)> {
    let progress = update.progress;
    if !progress.is_finite() || progress < 0.0 || progress > f64::from(u32::MAX) {
        return Err(ValidationError::QuizProgress);
    }
    let score = match update.score {
        Some(score) if !score.is_finite() || !(0.0..=100.0).contains(&score) => {
            return Err(ValidationError::Score);
        }
        Some(score) => Some(score.round() as u8),
        None => None,
    };
    Ok((progress.round() as u32, score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id() {
        assert_eq!(path_id("12"), Ok(12));
        assert_eq!(path_id("0"), Err(ValidationError::PathId("0".into())));
        assert_eq!(path_id("abc"), Err(ValidationError::PathId("abc".into())));
    }

    #[test]
    fn test_deck_progress_range() {
        assert_eq!(deck_progress(&DeckProgressUpdate { progress: 42.0 }), Ok(42));
        assert_eq!(deck_progress(&DeckProgressUpdate { progress: 100.0 }), Ok(100));
        assert_eq!(
            deck_progress(&DeckProgressUpdate { progress: 101.0 }),
            Err(ValidationError::DeckProgress)
        );
        assert_eq!(
            deck_progress(&DeckProgressUpdate { progress: -1.0 }),
            Err(ValidationError::DeckProgress)
        );
    }

    #[test]
    fn test_quiz_progress() {
        let ok = QuizProgressUpdate {
            progress: 3.0,
            score: Some(80.0),
        };
        assert_eq!(quiz_progress(&ok), Ok((3, Some(80))));

        let negative = QuizProgressUpdate {
            progress: -2.0,
            score: None,
        };
        assert_eq!(quiz_progress(&negative), Err(ValidationError::QuizProgress));

        let bad_score = QuizProgressUpdate {
            progress: 3.0,
            score: Some(140.0),
        };
        assert_eq!(quiz_progress(&bad_score), Err(ValidationError::Score));
        assert_eq!(
            ValidationError::Score.to_string(),
            "Score must be a number between 0 and 100"
        );
    }

    #[test]
    fn test_empty_fields_are_named() {
        let user = NewUser {
            uid: "abc".into(),
            username: "  ".into(),
            email: "a@b.c".into(),
            photo_url: None,
        };
        assert_eq!(
            super::user(&user).unwrap_err().to_string(),
            "Field 'username' must not be empty"
        );
    }
}
