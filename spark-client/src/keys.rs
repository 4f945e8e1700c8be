//! Resource keys of the tutoring API. Each key doubles as the GET path of
//! its read, and user-scoped keys all live under [`users`].

use shared_http::api::RecordId;
use spark::ResourceKey;

pub const AUTH: &str = "/api/auth";
pub const USERS: &str = "/api/users";
pub const FLASHCARD_DECKS: &str = "/api/flashcard-decks";
pub const QUIZZES: &str = "/api/quizzes";
pub const CHAT_CONVERSATIONS: &str = "/api/chat-conversations";

pub fn auth() -> ResourceKey {
    ResourceKey::from([AUTH])
}

pub fn current_user() -> ResourceKey {
    auth().child("me")
}

pub fn users() -> ResourceKey {
    ResourceKey::from([USERS])
}

/// Shares the `["/api/users", <segment>]` space with the id-scoped keys, so
/// invalidating a uid that looks like an id also marks that id's collections
/// stale. That only over-invalidates.
pub fn user(uid: &str) -> ResourceKey {
    users().child(uid)
}

fn user_scoped(user_id: RecordId, collection: &str) -> ResourceKey {
    users().child(user_id.to_string()).child(collection)
}

pub fn study_sessions(user_id: RecordId) -> ResourceKey {
    user_scoped(user_id, "study-sessions")
}

pub fn documents(user_id: RecordId) -> ResourceKey {
    user_scoped(user_id, "documents")
}

pub fn flashcard_decks(user_id: RecordId) -> ResourceKey {
    user_scoped(user_id, "flashcard-decks")
}

pub fn quizzes(user_id: RecordId) -> ResourceKey {
    user_scoped(user_id, "quizzes")
}

pub fn chat_conversations(user_id: RecordId) -> ResourceKey {
    user_scoped(user_id, "chat-conversations")
}

pub fn flashcard_deck(deck_id: RecordId) -> ResourceKey {
    ResourceKey::from([FLASHCARD_DECKS.to_string(), deck_id.to_string()])
}

pub fn flashcards(deck_id: RecordId) -> ResourceKey {
    flashcard_deck(deck_id).child("flashcards")
}

pub fn quiz(quiz_id: RecordId) -> ResourceKey {
    ResourceKey::from([QUIZZES.to_string(), quiz_id.to_string()])
}

pub fn quiz_questions(quiz_id: RecordId) -> ResourceKey {
    quiz(quiz_id).child("questions")
}

pub fn chat_messages(conversation_id: RecordId) -> ResourceKey {
    ResourceKey::from([CHAT_CONVERSATIONS.to_string(), conversation_id.to_string()])
        .child("messages")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_address_their_reads() {
        assert_eq!(documents(42).to_path(), "/api/users/42/documents");
        assert_eq!(flashcards(3).to_path(), "/api/flashcard-decks/3/flashcards");
        assert_eq!(quiz_questions(5).to_path(), "/api/quizzes/5/questions");
        assert_eq!(chat_messages(7).to_path(), "/api/chat-conversations/7/messages");
        assert_eq!(current_user().to_path(), "/api/auth/me");
    }

    #[test]
    fn test_user_scoped_keys_share_prefix() {
        for key in [
            study_sessions(1),
            documents(1),
            flashcard_decks(1),
            quizzes(1),
            chat_conversations(1),
            user("firebase-uid"),
        ] {
            assert!(key.starts_with(&users()), "{key} should be under {}", users());
        }
        assert!(!quiz(1).starts_with(&users()));
        assert!(current_user().starts_with(&auth()));
        assert!(!documents(2).starts_with(&users().child("1")));
    }

    #[test]
    fn test_numeric_uid_overlaps_id_scoped_keys() {
        assert!(documents(1).starts_with(&user("1")));
        assert!(quizzes(1).starts_with(&user("1")));
        assert!(!documents(1).starts_with(&user("uid-grace")));
    }
}
