use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::{Error, Result};
use shared_http::api::{
    ChatConversation, ChatMessage, Document, Flashcard, FlashcardDeck, NewChatConversation,
    NewChatMessage, NewDocument, NewFlashcard, NewFlashcardDeck, NewQuiz, NewQuizQuestion,
    NewStudySession, NewUser, Quiz, QuizQuestion, QuizStatus, RecordId, StudySession, User,
};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Port for the tutoring records behind the REST API
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Creates the user unless the uid is taken. Returns the stored user and
    /// whether it was created by this call.
    async fn register_user(&self, user: NewUser) -> Result<(User, bool)>;
    async fn user(&self, id: RecordId) -> Result<Option<User>>;
    async fn user_by_uid(&self, uid: &str) -> Result<Option<User>>;

    async fn study_sessions(&self, user_id: RecordId) -> Result<Vec<StudySession>>;
    async fn create_study_session(&self, session: NewStudySession) -> Result<StudySession>;

    async fn documents(&self, user_id: RecordId) -> Result<Vec<Document>>;
    async fn create_document(&self, document: NewDocument) -> Result<Document>;
    async fn delete_document(&self, id: RecordId) -> Result<bool>;

    async fn flashcard_decks(&self, user_id: RecordId) -> Result<Vec<FlashcardDeck>>;
    async fn flashcard_deck(&self, id: RecordId) -> Result<Option<FlashcardDeck>>;
    async fn create_flashcard_deck(&self, deck: NewFlashcardDeck) -> Result<FlashcardDeck>;
    async fn update_flashcard_deck_progress(&self, id: RecordId, progress: u8) -> Result<FlashcardDeck>;

    async fn flashcards(&self, deck_id: RecordId) -> Result<Vec<Flashcard>>;
    async fn create_flashcard(&self, card: NewFlashcard) -> Result<Flashcard>;
    async fn update_flashcard_mastery(&self, id: RecordId, mastered: bool) -> Result<Flashcard>;

    async fn quizzes(&self, user_id: RecordId) -> Result<Vec<Quiz>>;
    async fn quiz(&self, id: RecordId) -> Result<Option<Quiz>>;
    async fn create_quiz(&self, quiz: NewQuiz) -> Result<Quiz>;
    async fn update_quiz_progress(&self, id: RecordId, progress: u32, score: Option<u8>) -> Result<Quiz>;

    async fn quiz_questions(&self, quiz_id: RecordId) -> Result<Vec<QuizQuestion>>;
    async fn create_quiz_question(&self, question: NewQuizQuestion) -> Result<QuizQuestion>;

    async fn chat_conversations(&self, user_id: RecordId) -> Result<Vec<ChatConversation>>;
    async fn create_chat_conversation(&self, conversation: NewChatConversation) -> Result<ChatConversation>;

    async fn chat_messages(&self, conversation_id: RecordId) -> Result<Vec<ChatMessage>>;
    async fn create_chat_message(&self, message: NewChatMessage) -> Result<ChatMessage>;
}

/// One table: rows by id, ids handed out from 1.
struct Table<T> {
    rows: DashMap<RecordId, T>,
    next_id: AtomicI64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn insert_with(&self, build: impl FnOnce(RecordId) -> T) -> T {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: RecordId) -> Option<T> {
        self.rows.get(&id).map(|row| row.value().clone())
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .iter()
            .filter(|row| predicate(row.value()))
            .map(|row| row.value().clone())
            .collect()
    }

    fn update(&self, id: RecordId, apply: impl FnOnce(&mut T)) -> Option<T> {
        self.rows.get_mut(&id).map(|mut row| {
            apply(row.value_mut());
            row.value().clone()
        })
    }

    fn remove(&self, id: RecordId) -> bool {
        self.rows.remove(&id).is_some()
    }
}

/// Sorts newest first; equal timestamps fall back to the higher id.
fn newest_first<T>(rows: &mut [T], stamp: impl Fn(&T) -> (DateTime<Utc>, RecordId)) {
    rows.sort_by(|a, b| stamp(b).cmp(&stamp(a)));
}

fn by_id<T>(rows: &mut [T], id: impl Fn(&T) -> RecordId) {
    rows.sort_by_key(|row| id(row));
}

/// Volatile in-memory store. Everything is lost on restart.
pub struct MemStorage {
    users: Table<User>,
    user_ids_by_uid: DashMap<String, RecordId>,
    study_sessions: Table<StudySession>,
    documents: Table<Document>,
    flashcard_decks: Table<FlashcardDeck>,
    flashcards: Table<Flashcard>,
    quizzes: Table<Quiz>,
    quiz_questions: Table<QuizQuestion>,
    chat_conversations: Table<ChatConversation>,
    chat_messages: Table<ChatMessage>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            user_ids_by_uid: DashMap::new(),
            study_sessions: Table::new(),
            documents: Table::new(),
            flashcard_decks: Table::new(),
            flashcards: Table::new(),
            quizzes: Table::new(),
            quiz_questions: Table::new(),
            chat_conversations: Table::new(),
            chat_messages: Table::new(),
        }
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn register_user(&self, user: NewUser) -> Result<(User, bool)> {
        match self.user_ids_by_uid.entry(user.uid.clone()) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                let stored = self
                    .users
                    .get(id)
                    .ok_or_else(|| Error::Internal(format!("uid index points at missing user {id}")))?;
                Ok((stored, false))
            }
            Entry::Vacant(slot) => {
                let created = self.users.insert_with(|id| User {
                    id,
                    uid: user.uid,
                    username: user.username,
                    email: user.email,
                    photo_url: user.photo_url,
                    created_at: Utc::now(),
                });
                slot.insert(created.id);
                debug!("Registered user {} ({})", created.id, created.uid);
                Ok((created, true))
            }
        }
    }

    async fn user(&self, id: RecordId) -> Result<Option<User>> {
        Ok(self.users.get(id))
    }

    async fn user_by_uid(&self, uid: &str) -> Result<Option<User>> {
        Ok(self
            .user_ids_by_uid
            .get(uid)
            .and_then(|id| self.users.get(*id.value())))
    }

    async fn study_sessions(&self, user_id: RecordId) -> Result<Vec<StudySession>> {
        let mut sessions = self.study_sessions.filter(|s| s.user_id == user_id);
        newest_first(&mut sessions, |s| (s.date, s.id));
        Ok(sessions)
    }

    async fn create_study_session(&self, session: NewStudySession) -> Result<StudySession> {
        Ok(self.study_sessions.insert_with(|id| StudySession {
            id,
            user_id: session.user_id,
            topic: session.topic,
            date: Utc::now(),
            duration: session.duration,
            resources: session.resources,
        }))
    }

    async fn documents(&self, user_id: RecordId) -> Result<Vec<Document>> {
        let mut documents = self.documents.filter(|d| d.user_id == user_id);
        newest_first(&mut documents, |d| (d.uploaded_at, d.id));
        Ok(documents)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        Ok(self.documents.insert_with(|id| Document {
            id,
            user_id: document.user_id,
            name: document.name,
            kind: document.kind,
            size: document.size,
            url: document.url,
            tags: document.tags,
            uploaded_at: Utc::now(),
        }))
    }

    async fn delete_document(&self, id: RecordId) -> Result<bool> {
        Ok(self.documents.remove(id))
    }

    async fn flashcard_decks(&self, user_id: RecordId) -> Result<Vec<FlashcardDeck>> {
        let mut decks = self.flashcard_decks.filter(|d| d.user_id == user_id);
        newest_first(&mut decks, |d| (d.created_at, d.id));
        Ok(decks)
    }

    async fn flashcard_deck(&self, id: RecordId) -> Result<Option<FlashcardDeck>> {
        Ok(self.flashcard_decks.get(id))
    }

    async fn create_flashcard_deck(&self, deck: NewFlashcardDeck) -> Result<FlashcardDeck> {
        Ok(self.flashcard_decks.insert_with(|id| FlashcardDeck {
            id,
            user_id: deck.user_id,
            title: deck.title,
            description: deck.description,
            card_count: deck.card_count,
            progress: deck.progress,
            created_at: Utc::now(),
        }))
    }

    async fn update_flashcard_deck_progress(&self, id: RecordId, progress: u8) -> Result<FlashcardDeck> {
        self.flashcard_decks
            .update(id, |deck| deck.progress = progress)
            .ok_or_else(|| Error::RecordNotFound(format!("Flashcard deck with id {id}")))
    }

    async fn flashcards(&self, deck_id: RecordId) -> Result<Vec<Flashcard>> {
        let mut cards = self.flashcards.filter(|c| c.deck_id == deck_id);
        by_id(&mut cards, |c| c.id);
        Ok(cards)
    }

    async fn create_flashcard(&self, card: NewFlashcard) -> Result<Flashcard> {
        Ok(self.flashcards.insert_with(|id| Flashcard {
            id,
            deck_id: card.deck_id,
            question: card.question,
            answer: card.answer,
            mastered: card.mastered,
        }))
    }

    async fn update_flashcard_mastery(&self, id: RecordId, mastered: bool) -> Result<Flashcard> {
        self.flashcards
            .update(id, |card| card.mastered = mastered)
            .ok_or_else(|| Error::RecordNotFound(format!("Flashcard with id {id}")))
    }

    async fn quizzes(&self, user_id: RecordId) -> Result<Vec<Quiz>> {
        let mut quizzes = self.quizzes.filter(|q| q.user_id == user_id);
        newest_first(&mut quizzes, |q| (q.created_at, q.id));
        Ok(quizzes)
    }

    async fn quiz(&self, id: RecordId) -> Result<Option<Quiz>> {
        Ok(self.quizzes.get(id))
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> Result<Quiz> {
        Ok(self.quizzes.insert_with(|id| Quiz {
            id,
            user_id: quiz.user_id,
            title: quiz.title,
            description: quiz.description,
            question_count: quiz.question_count,
            time_estimate: quiz.time_estimate,
            status: quiz.status,
            progress: quiz.progress,
            score: quiz.score,
            created_at: Utc::now(),
        }))
    }

    async fn update_quiz_progress(&self, id: RecordId, progress: u32, score: Option<u8>) -> Result<Quiz> {
        self.quizzes
            .update(id, |quiz| {
                quiz.progress = progress;
                quiz.status = if progress == quiz.question_count {
                    QuizStatus::Completed
                } else {
                    QuizStatus::InProgress
                };
                if score.is_some() {
                    quiz.score = score;
                }
            })
            .ok_or_else(|| Error::RecordNotFound(format!("Quiz with id {id}")))
    }

    async fn quiz_questions(&self, quiz_id: RecordId) -> Result<Vec<QuizQuestion>> {
        let mut questions = self.quiz_questions.filter(|q| q.quiz_id == quiz_id);
        by_id(&mut questions, |q| q.id);
        Ok(questions)
    }

    async fn create_quiz_question(&self, question: NewQuizQuestion) -> Result<QuizQuestion> {
        Ok(self.quiz_questions.insert_with(|id| QuizQuestion {
            id,
            quiz_id: question.quiz_id,
            question_text: question.question_text,
            code: question.code,
            options: question.options,
            correct_answer: question.correct_answer,
        }))
    }

    async fn chat_conversations(&self, user_id: RecordId) -> Result<Vec<ChatConversation>> {
        let mut conversations = self.chat_conversations.filter(|c| c.user_id == user_id);
        newest_first(&mut conversations, |c| (c.created_at, c.id));
        Ok(conversations)
    }

    async fn create_chat_conversation(&self, conversation: NewChatConversation) -> Result<ChatConversation> {
        Ok(self.chat_conversations.insert_with(|id| ChatConversation {
            id,
            user_id: conversation.user_id,
            title: conversation.title,
            created_at: Utc::now(),
        }))
    }

    /// Oldest first, as a transcript reads.
    async fn chat_messages(&self, conversation_id: RecordId) -> Result<Vec<ChatMessage>> {
        let mut messages = self.chat_messages.filter(|m| m.conversation_id == conversation_id);
        messages.sort_by_key(|m| (m.timestamp, m.id));
        Ok(messages)
    }

    async fn create_chat_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        Ok(self.chat_messages.insert_with(|id| ChatMessage {
            id,
            conversation_id: message.conversation_id,
            role: message.role,
            content: message.content,
            timestamp: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_http::api::ChatRole;

    fn new_user(uid: &str) -> NewUser {
        NewUser {
            uid: uid.to_string(),
            username: format!("{uid}-name"),
            email: format!("{uid}@example.com"),
            photo_url: None,
        }
    }

    fn new_quiz(user_id: RecordId, title: &str) -> NewQuiz {
        NewQuiz {
            user_id,
            title: title.to_string(),
            description: None,
            question_count: 4,
            time_estimate: 10,
            status: QuizStatus::New,
            progress: 0,
            score: None,
        }
    }

    #[tokio::test]
    async fn test_register_user_is_idempotent_on_uid() {
        let storage = MemStorage::new();

        let (first, created) = storage.register_user(new_user("abc")).await.unwrap();
        assert!(created);
        assert_eq!(first.id, 1);

        let (again, created) = storage.register_user(new_user("abc")).await.unwrap();
        assert!(!created);
        assert_eq!(again, first);

        let (other, _) = storage.register_user(new_user("def")).await.unwrap();
        assert_eq!(other.id, 2);
        assert_eq!(storage.user_by_uid("def").await.unwrap(), Some(other));
        assert_eq!(storage.user(1).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_lists_are_scoped_and_newest_first() {
        let storage = MemStorage::new();
        for title in ["first", "second", "third"] {
            storage.create_quiz(new_quiz(1, title)).await.unwrap();
        }
        storage.create_quiz(new_quiz(2, "elsewhere")).await.unwrap();

        let titles: Vec<String> = storage
            .quizzes(1)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.title)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_quiz_progress_sets_status_and_keeps_score() {
        let storage = MemStorage::new();
        let quiz = storage.create_quiz(new_quiz(1, "rust")).await.unwrap();

        let halfway = storage.update_quiz_progress(quiz.id, 2, None).await.unwrap();
        assert_eq!(halfway.status, QuizStatus::InProgress);
        assert_eq!(halfway.score, None);

        let done = storage.update_quiz_progress(quiz.id, 4, Some(75)).await.unwrap();
        assert_eq!(done.status, QuizStatus::Completed);
        assert_eq!(done.score, Some(75));

        let revisited = storage.update_quiz_progress(quiz.id, 4, None).await.unwrap();
        assert_eq!(revisited.score, Some(75));
    }

    #[tokio::test]
    async fn test_updates_on_missing_records_fail() {
        let storage = MemStorage::new();
        assert!(matches!(
            storage.update_flashcard_deck_progress(9, 10).await,
            Err(Error::RecordNotFound(_))
        ));
        assert!(matches!(
            storage.update_flashcard_mastery(9, true).await,
            Err(Error::RecordNotFound(_))
        ));
        assert!(matches!(
            storage.update_quiz_progress(9, 1, None).await,
            Err(Error::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let storage = MemStorage::new();
        let document = storage
            .create_document(NewDocument {
                user_id: 1,
                name: "notes.pdf".into(),
                kind: "pdf".into(),
                size: 1024,
                url: "/uploads/notes.pdf".into(),
                tags: vec![],
            })
            .await
            .unwrap();

        assert!(storage.delete_document(document.id).await.unwrap());
        assert!(!storage.delete_document(document.id).await.unwrap());
        assert!(storage.documents(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_messages_read_oldest_first() {
        let storage = MemStorage::new();
        for content in ["hello", "how are you", "fine"] {
            storage
                .create_chat_message(NewChatMessage {
                    conversation_id: 1,
                    role: ChatRole::User,
                    content: content.into(),
                })
                .await
                .unwrap();
        }

        let contents: Vec<String> = storage
            .chat_messages(1)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["hello", "how are you", "fine"]);
    }
}
